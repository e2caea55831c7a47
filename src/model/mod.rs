pub mod relations;
pub mod work_item;
