//! The interactive elevation map: a session state machine driving any
//! [`MapWidget`], plus a Leaflet page implementation of that widget.

mod leaflet;
mod session;
mod widget;

#[cfg(test)]
pub mod test_session;

pub use leaflet::LeafletPage;
pub use session::{MapSession, SessionError, UpdateOutcome, ViewState};
pub use widget::{Control, ControlPosition, FitPadding, LayerId, MapWidget};
