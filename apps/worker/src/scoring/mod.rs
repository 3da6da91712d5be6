pub mod composite;
pub mod hard_requirements;
pub mod keyword;
pub mod project;
pub mod semantic;
