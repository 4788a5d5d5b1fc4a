mod broadcast;
mod frame;
mod group;
mod origin;
mod produce;
mod state;
mod track;

pub use broadcast::*;
pub use frame::*;
pub use group::*;
pub use origin::*;
pub use produce::*;
pub use track::*;

pub(crate) use state::*;
