// Path: crates/crypto/src/sign/eddsa/babyjubjub.rs
//! Affine arithmetic on BabyJubJub, the twisted Edwards curve embedded in BN254's
//! scalar field (`a·x² + y² = 1 + d·x²·y²`).

use crate::algorithms::hash::{field_to_biguint, Fr};
use crate::error::CryptoError;
use ark_ff::{Field, MontFp, One, Zero};
use num_bigint::BigUint;

/// Curve coefficient `a`.
pub const A: Fr = MontFp!("168700");
/// Curve coefficient `d`.
pub const D: Fr = MontFp!("168696");

const BASE8_X: Fr =
    MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553");
const BASE8_Y: Fr =
    MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203");
// The prime order of the subgroup generated by Base8. It is below the field modulus,
// so it can be carried as a field constant and lifted to an integer when needed.
const SUBORDER: Fr =
    MontFp!("2736030358979909402780800718157159386076813972158567259200215660948447373041");

/// The order `l` of the prime subgroup generated by [`base8`].
pub fn suborder() -> BigUint {
    field_to_biguint(&SUBORDER)
}

/// A point in affine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// The x coordinate.
    pub x: Fr,
    /// The y coordinate.
    pub y: Fr,
}

/// The generator of the prime-order subgroup (8 × the curve generator).
pub fn base8() -> Point {
    Point {
        x: BASE8_X,
        y: BASE8_Y,
    }
}

impl Point {
    /// The neutral element `(0, 1)`.
    pub fn identity() -> Self {
        Self {
            x: Fr::zero(),
            y: Fr::one(),
        }
    }

    /// Checks the curve equation.
    pub fn is_on_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        A * x2 + y2 == Fr::one() + D * x2 * y2
    }

    /// Twisted Edwards addition. The formula is complete on this curve because `d`
    /// is not a square, so the denominators only vanish for points off the curve.
    pub fn add(&self, other: &Point) -> Result<Point, CryptoError> {
        let x1y2 = self.x * other.y;
        let y1x2 = self.y * other.x;
        let x1x2 = self.x * other.x;
        let y1y2 = self.y * other.y;
        let dxy = D * x1x2 * y1y2;
        let x_den = (Fr::one() + dxy)
            .inverse()
            .ok_or_else(|| CryptoError::OperationFailed("point addition: x denominator".into()))?;
        let y_den = (Fr::one() - dxy)
            .inverse()
            .ok_or_else(|| CryptoError::OperationFailed("point addition: y denominator".into()))?;
        Ok(Point {
            x: (x1y2 + y1x2) * x_den,
            y: (y1y2 - A * x1x2) * y_den,
        })
    }

    /// Double-and-add scalar multiplication, most significant bit first.
    pub fn mul(&self, scalar: &BigUint) -> Result<Point, CryptoError> {
        let mut acc = Point::identity();
        for byte in scalar.to_bytes_be() {
            for bit in (0..8).rev() {
                acc = acc.add(&acc)?;
                if (byte >> bit) & 1 == 1 {
                    acc = acc.add(self)?;
                }
            }
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base8_is_on_curve_and_has_prime_order() {
        let b = base8();
        assert!(b.is_on_curve());
        assert_eq!(b.mul(&suborder()).unwrap(), Point::identity());
        assert_ne!(b.mul(&BigUint::from(7u32)).unwrap(), Point::identity());
    }

    #[test]
    fn test_scalar_mul_distributes() {
        let b = base8();
        let five = b.mul(&BigUint::from(5u32)).unwrap();
        let two = b.mul(&BigUint::from(2u32)).unwrap();
        let three = b.mul(&BigUint::from(3u32)).unwrap();
        assert_eq!(two.add(&three).unwrap(), five);
        assert!(five.is_on_curve());
    }

    #[test]
    fn test_identity_is_neutral() {
        let b = base8();
        assert_eq!(b.add(&Point::identity()).unwrap(), b);
        assert_eq!(b.mul(&BigUint::from(0u32)).unwrap(), Point::identity());
    }
}
