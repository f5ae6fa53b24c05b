pub mod color;
pub mod help;
pub mod log_list;
pub mod reminder_list;
pub mod status_bar;
pub mod summary_box;
pub mod tabs;
pub mod user_form;
