//! Keypairs over a [`CurveId`] preset.
//!
//! Grounded on `cli/src/crypto.rs`'s `SecretScalar` wrapper: the secret
//! scalar's backing bytes are zeroized on drop, and `Keypair` does not
//! derive `Clone` so a secret key cannot be accidentally duplicated.

use num_bigint::BigUint;
use rand::RngCore;
use zeroize::Zeroize;

use crate::curve::{CurveId, Point, Scalar};

/// A secret scalar whose big-endian byte representation is zeroized on drop.
pub struct SecretScalar {
    curve: CurveId,
    bytes: Vec<u8>,
}

impl SecretScalar {
    fn from_scalar(scalar: &Scalar) -> Self {
        SecretScalar {
            curve: scalar.curve(),
            bytes: scalar.value().to_bytes_be(),
        }
    }

    pub fn to_scalar(&self) -> Scalar {
        Scalar::new(self.curve, BigUint::from_bytes_be(&self.bytes))
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// A keypair `(sk, pk = sk*G)`. Not `Clone`: secret material should have one
/// owner.
pub struct Keypair {
    sk: SecretScalar,
    pub pk: Point,
}

impl Keypair {
    /// Uniform `sk in [1, q-1]`, `pk = sk*G`.
    pub fn generate(curve: CurveId, rng: &mut impl RngCore) -> Self {
        let sk = Scalar::random(curve, rng);
        let pk = Point::generator(curve).mul(&sk);
        Keypair {
            sk: SecretScalar::from_scalar(&sk),
            pk,
        }
    }

    pub fn from_secret(sk: Scalar) -> Self {
        let pk = Point::generator(sk.curve()).mul(&sk);
        Keypair {
            sk: SecretScalar::from_scalar(&sk),
            pk,
        }
    }

    pub fn secret(&self) -> Scalar {
        self.sk.to_scalar()
    }

    pub fn public(&self) -> &Point {
        &self.pk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_consistent_public_key() {
        let mut rng = rand::thread_rng();
        let kp = Keypair::generate(CurveId::P192, &mut rng);
        let expected = Point::generator(CurveId::P192).mul(&kp.secret());
        assert_eq!(kp.pk, expected);
    }

    #[test]
    fn from_secret_roundtrips() {
        let mut rng = rand::thread_rng();
        let sk = Scalar::random(CurveId::P192, &mut rng);
        let kp = Keypair::from_secret(sk.clone());
        assert_eq!(kp.secret(), sk);
    }
}
