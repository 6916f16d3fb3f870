pub mod hash_util;
