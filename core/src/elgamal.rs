//! Twisted ElGamal encryption: `(c1, c2) = (k*G, v*G + k*pk)`.
//!
//! Grounded on `original_source/zkp/zk_pedersen_elgamal.py::constant_time_decrypt`
//! and `create_zk_transaction`'s inline encryption.

use serde::{Deserialize, Serialize};

use crate::context::CryptoContext;
use crate::curve::{CurveId, Point, Scalar};

/// An ElGamal ciphertext pair. Additively homomorphic on both coordinates:
/// `Enc(a) + Enc(b) = Enc(a+b)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub c1: Point,
    pub c2: Point,
}

impl Ciphertext {
    pub fn add(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1.add(&other.c1),
            c2: self.c2.add(&other.c2),
        }
    }

    pub fn sub(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1.sub(&other.c1),
            c2: self.c2.sub(&other.c2),
        }
    }

    /// Both coordinates lie on the curve and neither is the identity
    /// element, per §7's `InvalidTransaction` checks.
    pub fn is_well_formed(&self) -> bool {
        self.c1.is_on_curve()
            && self.c2.is_on_curve()
            && !self.c1.is_identity
            && !self.c2.is_identity
    }
}

/// Encrypt `value` for `pk`, drawing fresh randomness `k` unless one is
/// injected (test determinism only — production callers always pass `None`).
pub fn encrypt(
    curve: CurveId,
    value: u64,
    pk: &Point,
    k: Option<Scalar>,
    rng: &mut impl rand::RngCore,
) -> (Ciphertext, Scalar) {
    let k = k.unwrap_or_else(|| Scalar::random(curve, rng));
    let g = Point::generator(curve);
    let v = Scalar::new(curve, num_bigint::BigUint::from(value));
    let c1 = g.mul(&k);
    let c2 = g.mul(&v).add(&pk.mul(&k));
    (Ciphertext { c1, c2 }, k)
}

/// Decrypt to the plaintext point `v*G`; recovering `v` itself requires
/// [`CryptoContext::lookup`].
pub fn decrypt_to_point(ciphertext: &Ciphertext, sk: &Scalar) -> Point {
    ciphertext.c2.sub(&ciphertext.c1.mul(sk))
}

/// Decrypt and recover the scalar `v` via the context's value table. Returns
/// `None` if `v` lies outside the precomputed range — an expected, non-fatal
/// outcome, not an error.
pub fn decrypt(ctx: &CryptoContext, ciphertext: &Ciphertext, sk: &Scalar) -> Option<u64> {
    let point = decrypt_to_point(ciphertext, sk);
    ctx.lookup(&point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;

    #[test]
    fn encrypt_decrypt_roundtrip_via_table() {
        let ctx = CryptoContext::new(CurveId::P192, 100);
        let mut rng = rand::thread_rng();
        let recipient = Keypair::generate(CurveId::P192, &mut rng);

        let (ct, _k) = encrypt(CurveId::P192, 42, recipient.public(), None, &mut rng);
        let recovered = decrypt(&ctx, &ct, &recipient.secret());
        assert_eq!(recovered, Some(42));
    }

    #[test]
    fn homomorphic_addition_of_ciphertexts() {
        let ctx = CryptoContext::new(CurveId::P192, 200_000);
        let mut rng = rand::thread_rng();
        let recipient = Keypair::generate(CurveId::P192, &mut rng);

        let (ct1, _) = encrypt(CurveId::P192, 12345, recipient.public(), None, &mut rng);
        let (ct2, _) = encrypt(CurveId::P192, 67890, recipient.public(), None, &mut rng);
        let sum = ct1.add(&ct2);

        let recovered = decrypt(&ctx, &sum, &recipient.secret());
        assert_eq!(recovered, Some(80235));
    }

    #[test]
    fn out_of_table_value_is_unrecoverable_not_an_error() {
        let ctx = CryptoContext::new(CurveId::P192, 10);
        let mut rng = rand::thread_rng();
        let recipient = Keypair::generate(CurveId::P192, &mut rng);
        let (ct, _) = encrypt(CurveId::P192, 500, recipient.public(), None, &mut rng);
        assert_eq!(decrypt(&ctx, &ct, &recipient.secret()), None);
    }

    #[test]
    fn well_formed_rejects_identity_ciphertext() {
        let curve = CurveId::P192;
        let degenerate = Ciphertext {
            c1: Point::identity(curve),
            c2: Point::generator(curve),
        };
        assert!(!degenerate.is_well_formed());
    }
}
