pub mod sealed_box;

pub use sealed_box::{
    decode_public_key, seal, seal_bytes, SealRequest, SealedSecret, PUBLIC_KEY_SIZE, SEAL_OVERHEAD,
};
