//! Domain records and the input shapes that create or change them.
//!
//! Records (`User`, `Game`, `Review`) are what the stores hand back. Inputs
//! (`NewGame`, `NewReview`, `UserUpdate`, ...) carry raw client values and are
//! validated by the owning service into drafts before any persistence call.

pub mod game;
pub mod review;
pub mod user;

pub use game::{Game, GameDraft, GameFilter, GameView, NewGame, SearchQuery};
pub use review::{NewReview, Review, ReviewChanges, ReviewDraft, ReviewFilter, ReviewUpdate};
pub use user::{NewUser, User, UserChanges, UserProfile, UserUpdate};
