pub mod custom_view;
pub mod state;
pub mod validate;
