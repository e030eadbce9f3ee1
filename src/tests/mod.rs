mod helpers;
mod versioning;
