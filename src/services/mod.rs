// Service exports
pub mod supabase;

pub use supabase::{SupabaseClient, SupabaseError, SupabaseTables};
