/// UI module exports
pub mod archive_list;
pub mod components;
pub mod popup;
