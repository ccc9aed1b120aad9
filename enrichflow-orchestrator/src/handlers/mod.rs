pub mod imports;
pub mod redirect_resumption;
