//! Auth adapters for the managed identity provider.

mod gotrue;
mod mock;

pub use gotrue::{GoTrueAuthAdapter, GoTrueConfig};
pub use mock::{MockIdentityProvider, MockSessionValidator};
