pub mod debounce;
pub mod editing_state;
pub mod session;
