/*
[INPUT]:  Wallet client capability sets (relay, injected, embedded connector)
[OUTPUT]: One uniform connect/sign/disconnect contract per provider
[POS]:    Wallet layer - reconciles heterogeneous wallet signing protocols
[UPDATE]: When adding wallet providers or changing a wallet's signing convention
*/

pub mod adapter;
pub mod carrier;
pub mod connector;
pub mod injected;
pub mod local;
pub mod relay;

pub use adapter::{DisconnectListener, DropNotifier, SigningAdapter};
pub use connector::{EmbeddedConnector, LuteAdapter, WalletTransaction};
pub use injected::{
    EnableResult, InjectedAccount, InjectedWalletObject, KibisisAdapter, SignBytesResult,
    KIBISIS_WALLET_ID,
};
pub use local::LocalWallet;
pub use relay::{
    DataSigningRelay, DeflyAdapter, PeraAdapter, RelaySession, SignDataRequest, SignerTransaction,
    TransactionSigningRelay,
};
