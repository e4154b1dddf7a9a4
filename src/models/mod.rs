pub mod card;
pub mod de;
pub mod mapping;
pub mod price;
pub mod set;

pub use card::*;
pub use mapping::*;
pub use price::*;
pub use set::*;
