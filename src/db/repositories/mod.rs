pub mod annotations;
pub mod files;
pub mod last_visited;
pub mod nodes;
