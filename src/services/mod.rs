pub mod card_service;
pub mod lister_service;
pub mod page_service;
pub mod payload_service;
pub mod registry_service;
pub mod row_service;
pub mod template_service;
pub mod thumb_service;
pub mod tree_service;
pub mod user_metadata_service;
