use serde::{Deserialize, Serialize};

/// Label shown for symbols that are not in the asset table.
pub const UNKNOWN_DISPLAY_NAME: &str = "None";

/// Crypto assets the dashboard knows a display name for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoAsset {
    Bitcoin,
    Ethereum,
    Dogecoin,
    Solana,
    Xrp,
    BitcoinCash,
    Stellar,
    Cardano,
    Avalanche,
    Chainlink,
    Litecoin,
}

impl CryptoAsset {
    pub const ALL: [CryptoAsset; 11] = [
        CryptoAsset::Bitcoin,
        CryptoAsset::Ethereum,
        CryptoAsset::Dogecoin,
        CryptoAsset::Solana,
        CryptoAsset::Xrp,
        CryptoAsset::BitcoinCash,
        CryptoAsset::Stellar,
        CryptoAsset::Cardano,
        CryptoAsset::Avalanche,
        CryptoAsset::Chainlink,
        CryptoAsset::Litecoin,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            CryptoAsset::Bitcoin => "BTC",
            CryptoAsset::Ethereum => "ETH",
            CryptoAsset::Dogecoin => "DOGE",
            CryptoAsset::Solana => "SOL",
            CryptoAsset::Xrp => "XRP",
            CryptoAsset::BitcoinCash => "BCH",
            CryptoAsset::Stellar => "XLM",
            CryptoAsset::Cardano => "ADA",
            CryptoAsset::Avalanche => "AVAX",
            CryptoAsset::Chainlink => "LINK",
            CryptoAsset::Litecoin => "LTC",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CryptoAsset::Bitcoin => "Bitcoin",
            CryptoAsset::Ethereum => "Ethereum",
            CryptoAsset::Dogecoin => "Dogecoin",
            CryptoAsset::Solana => "Solana",
            CryptoAsset::Xrp => "XRP",
            CryptoAsset::BitcoinCash => "Bitcoin Cash",
            CryptoAsset::Stellar => "Stellar",
            CryptoAsset::Cardano => "Cardano",
            CryptoAsset::Avalanche => "Avalanche",
            CryptoAsset::Chainlink => "Chainlink",
            CryptoAsset::Litecoin => "Litecoin",
        }
    }

    /// Case-insensitive lookup by ticker symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|asset| asset.symbol().eq_ignore_ascii_case(symbol))
    }
}

/// Human-readable name for `symbol`, or [`UNKNOWN_DISPLAY_NAME`].
pub fn display_name(symbol: &str) -> &'static str {
    CryptoAsset::from_symbol(symbol)
        .map(|asset| asset.display_name())
        .unwrap_or(UNKNOWN_DISPLAY_NAME)
}
