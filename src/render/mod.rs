pub mod context;
pub mod data_view;
pub mod insights;
pub mod layout;
pub mod main_view;
pub mod overlays;
pub mod overview;
