pub mod state;


pub use state::FightState;
