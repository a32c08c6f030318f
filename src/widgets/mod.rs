pub mod entries_table;
pub mod filter_editor;
pub mod help;
pub mod status_bar;
