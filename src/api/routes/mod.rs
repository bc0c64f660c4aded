pub mod email;
pub mod health;
pub mod knot;
pub mod receipts;
pub mod suppliers;
