pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskFilter, TaskInput, TaskQuery, TaskStatus, TaskUpdate};
pub use user::{NewUser, Role, User, UserUpdate};
