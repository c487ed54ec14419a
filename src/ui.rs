pub mod font;
pub mod library_panel;
pub mod log_view;
pub mod properties_panel;
pub mod settings_window;
pub mod toolbar;
pub mod viewport;
