pub mod calibration;
pub mod item_view;
pub mod ledger;
pub mod selection;
pub mod standing;
pub mod world;
