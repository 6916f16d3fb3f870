pub mod controller_loop;
pub mod tasks;
