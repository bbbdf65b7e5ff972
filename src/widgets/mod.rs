pub mod controls;
pub mod datatable;
pub mod text_input;
