pub mod state;
pub use state::W65c02State;

pub mod w65c02;
pub use w65c02::W65c02;
