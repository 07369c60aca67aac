//! The ethscription marketplaces Salewatch knows about out of the box.

use salewatch_core::market::{FieldTargets, Market, MarketplaceEventSpec};

use crate::memory::MemoryRegistry;

pub const ETHSCRIPTIONS_COM_SALE: &str = "event EthscriptionPurchased(address indexed seller, address indexed buyer, bytes32 indexed ethscriptionId, uint256 price, bytes32 listingId)";

pub const ETCH_SALE: &str = "event EthscriptionOrderExecuted(bytes32 indexed orderHash, uint256 orderNonce, bytes32 ethscriptionId, uint256 quantity, address seller, address buyer, address currency, uint256 price, uint64 endTime)";

pub const ORDEX_MATCH: &str =
    "event Match(bytes32 leftHash, bytes32 rightHash, uint256 newLeftFill, uint256 newRightFill)";

pub const ORDEX_INTERNAL_TRANSFER: &str = "event InternalItemTransfer(address indexed _from, address indexed _to, uint256 indexed _ethscriptionId)";

pub const ETHERPHUNKS_SALE: &str = "event PhunkBought(bytes32 indexed phunkId, uint256 value, address indexed fromAddress, address indexed toAddress)";

pub const MEMESCRIBE_SALE: &str = "event EthscriptionPurchased(bytes32 indexed ethscriptionId, uint256 price, address indexed seller, address indexed buyer)";

pub const ETHSCRIPTIONS_COM: &str = "0xD729A94d6366a4fEac4A6869C8b3573cEe4701A9";
pub const ETCH_MARKET: &str = "0x57b8792c775D34Aa96092400983c3e112fCbC296";
pub const ORDEX: &str = "0xC33F8610941bE56fB0d84E25894C0d928CC97ddE";
/// Ordex exchange contract; emits `Match` for trades settled on `ORDEX`.
pub const ORDEX_EXCHANGE: &str = "0xC89C2E6FE008592D6a787eFd02DB7fDB8eA64020";
pub const ETHERPHUNKS_MARKET: &str = "0xD3418772623Be1a3cc6B6D45CB46420CEdD9154a";
pub const MEMESCRIBE: &str = "0x0e720B468737664Ec57bb545F798F71bC57605c1";

/// All built-in markets, in watch order.
pub fn markets() -> Vec<Market> {
    vec![
        Market::new("Ethscriptions.com", "https://ethscriptions.com", ETHSCRIPTIONS_COM).with_event(
            MarketplaceEventSpec::new(
                "EthscriptionPurchased",
                ETHSCRIPTIONS_COM_SALE,
                FieldTargets::new("ethscriptionId", "price", "seller", "buyer"),
            ),
        ),
        Market::new("Etch Market", "https://etch.market", ETCH_MARKET).with_event(
            MarketplaceEventSpec::new(
                "EthscriptionOrderExecuted",
                ETCH_SALE,
                FieldTargets::new("ethscriptionId", "price", "seller", "buyer"),
            ),
        ),
        // The InternalItemTransfer on the market contract carries the item
        // and both parties; the price only exists on the exchange's Match.
        Market::new("Ordex", "https://ordex.io", ORDEX).with_event(
            MarketplaceEventSpec::new(
                "Match",
                ORDEX_MATCH,
                FieldTargets::new("_ethscriptionId", "newLeftFill", "_from", "_to"),
            )
            .with_correlation(ORDEX_INTERNAL_TRANSFER, ORDEX)
            .with_emitter(ORDEX_EXCHANGE),
        ),
        Market::new("EtherPhunks Market", "https://etherphunks.eth.limo", ETHERPHUNKS_MARKET)
            .with_event(MarketplaceEventSpec::new(
                "PhunkBought",
                ETHERPHUNKS_SALE,
                FieldTargets::new("phunkId", "value", "fromAddress", "toAddress"),
            )),
        Market::new("MemeScribe", "https://memescribe.app", MEMESCRIBE).with_event(
            MarketplaceEventSpec::new(
                "EthscriptionPurchased",
                MEMESCRIBE_SALE,
                FieldTargets::new("ethscriptionId", "price", "seller", "buyer"),
            ),
        ),
    ]
}

/// A registry preloaded with [`markets`].
pub fn registry() -> MemoryRegistry {
    markets().into_iter().collect()
}
