//! Vector packing codec
//!
//! A vector of up to τ values rides in a single RLWE ciphertext, one value
//! per slot. The controller receives packed measurements, unpacks them into
//! one ciphertext per scalar, and multiplies those against RGSW-encrypted
//! matrix columns to produce packed results again.
//!
//! | Operation        | Input                 | Output                     |
//! |------------------|-----------------------|----------------------------|
//! | [`pack`]         | `&[i64]`, factor 1/L  | message polynomial         |
//! | [`encrypt_packed`] | `&[i64]`            | [`PackedCiphertext`]       |
//! | [`unpack`]       | [`PackedCiphertext`]  | one RLWE per slot          |
//! | [`decrypt_slots`] | [`PackedCiphertext`] | signed slot coefficients   |

mod layout;
mod pack;
mod unpack;

pub use layout::{bit_reverse, PackingLayout};
pub use pack::{decrypt_slots, decrypt_unpack, encrypt_packed, pack, PackedCiphertext};
pub use unpack::unpack;
