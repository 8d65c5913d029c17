use std::fmt::{self, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::E;

/// Forward-mode dual number: a value paired with one directional derivative.
///
/// `Dual { re, eps }` represents `re + eps·ε` where `ε² = 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dual {
    /// Primal value.
    pub re: E,
    /// Tangent (derivative) value.
    pub eps: E,
}

impl Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl Dual {
    #[inline]
    pub fn new(re: E, eps: E) -> Self {
        Dual { re, eps }
    }

    /// Create a constant (zero derivative).
    #[inline]
    pub fn constant(re: E) -> Self {
        Dual { re, eps: 0. }
    }

    /// Create a variable (unit derivative) for differentiation.
    #[inline]
    pub fn variable(re: E) -> Self {
        Dual { re, eps: 1. }
    }

    /// Apply the chain rule: given `f(self.re)` and `f'(self.re)`, produce the dual result.
    #[inline]
    fn chain(self, f_val: E, f_deriv: E) -> Self {
        // A constant stays constant even where `f'` is unbounded.
        let eps = if self.eps == 0. { 0. } else { self.eps * f_deriv };
        Dual { re: f_val, eps }
    }

    #[inline]
    pub fn powi(self, n: i32) -> Self {
        let deriv = if n == 0 { 0. } else { n as E * self.re.powi(n - 1) };
        self.chain(self.re.powi(n), deriv)
    }

    /// `self^n` for a constant real exponent.
    #[inline]
    pub fn powf(self, n: E) -> Self {
        let deriv = if n == 0. { 0. } else { n * self.re.powf(n - 1.) };
        self.chain(self.re.powf(n), deriv)
    }

    #[inline]
    pub fn exp(self) -> Self {
        let e = self.re.exp();
        self.chain(e, e)
    }

    #[inline]
    pub fn ln(self) -> Self {
        self.chain(self.re.ln(), 1. / self.re)
    }

    #[inline]
    pub fn sqrt(self) -> Self {
        let s = self.re.sqrt();
        self.chain(s, 0.5 / s)
    }
}

impl Add for Dual {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Dual {
            re: self.re + rhs.re,
            eps: self.eps + rhs.eps,
        }
    }
}

impl Sub for Dual {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Dual {
            re: self.re - rhs.re,
            eps: self.eps - rhs.eps,
        }
    }
}

impl Mul for Dual {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Dual {
            re: self.re * rhs.re,
            eps: self.re * rhs.eps + self.eps * rhs.re,
        }
    }
}

impl Div for Dual {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = 1. / rhs.re;
        Dual {
            re: self.re * inv,
            eps: (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        }
    }
}

impl Neg for Dual {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Dual {
            re: -self.re,
            eps: -self.eps,
        }
    }
}

// Mixed ops with plain scalars, on either side.
macro_rules! impl_scalar_ops {
    ($trait_:ident, $method:ident) => {
        impl $trait_<E> for Dual {
            type Output = Dual;
            #[inline]
            fn $method(self, rhs: E) -> Dual {
                <Dual as $trait_<Dual>>::$method(self, Dual::constant(rhs))
            }
        }

        impl $trait_<Dual> for E {
            type Output = Dual;
            #[inline]
            fn $method(self, rhs: Dual) -> Dual {
                <Dual as $trait_<Dual>>::$method(Dual::constant(self), rhs)
            }
        }
    };
}

impl_scalar_ops!(Add, add);
impl_scalar_ops!(Sub, sub);
impl_scalar_ops!(Mul, mul);
impl_scalar_ops!(Div, div);

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// Central finite difference: (f(x+h) - f(x-h)) / 2h
    fn finite_diff(f: impl Fn(E) -> E, x: E) -> E {
        let h = 1e-7;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    fn check_elemental(f_dual: impl Fn(Dual) -> Dual, f: impl Fn(E) -> E, x: E) {
        let d = f_dual(Dual::variable(x));
        assert_relative_eq!(d.re, f(x), max_relative = 1e-12);
        assert_relative_eq!(d.eps, finite_diff(&f, x), max_relative = 1e-5);
    }

    #[test]
    fn product_rule() {
        // (3 + ε)(4 + ε) = 12 + 7ε
        let c = Dual::new(3.0, 1.0) * Dual::new(4.0, 1.0);
        assert_eq!(c, Dual::new(12.0, 7.0));
    }

    #[test]
    fn quotient_rule() {
        let x = Dual::variable(2.0);
        let y = x / (x + 1.);
        assert_relative_eq!(y.re, 2.0 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(y.eps, 1.0 / 9.0, max_relative = 1e-12);
    }

    #[test]
    fn mixed_scalar_ops() {
        let x = Dual::variable(3.0);
        assert_eq!(x * 2.0, Dual::new(6.0, 2.0));
        assert_eq!(2.0 * x, Dual::new(6.0, 2.0));
        assert_eq!(1.0 - x, Dual::new(-2.0, -1.0));
        assert_eq!(-x, Dual::new(-3.0, -1.0));
    }

    #[test]
    fn elementals() {
        check_elemental(|x| x.powi(3), |x| x.powi(3), 2.0);
        check_elemental(|x| x.powf(2.5), |x| x.powf(2.5), 1.7);
        check_elemental(|x| x.exp(), |x| x.exp(), 0.3);
        check_elemental(|x| x.ln(), |x| x.ln(), 2.5);
        check_elemental(|x| x.sqrt(), |x| x.sqrt(), 4.0);
        check_elemental(|x| (-(x - 1.5).powi(2)).exp(), |x| (-(x - 1.5).powi(2)).exp(), 0.8);
    }

    #[test]
    fn power_at_zero() {
        assert_eq!(Dual::variable(0.).powi(2), Dual::new(0., 0.));
        assert_eq!(Dual::variable(0.).powi(1), Dual::new(0., 1.));
        assert_eq!(Dual::variable(0.).powi(0), Dual::new(1., 0.));
    }

    #[test]
    fn constants_at_singular_points() {
        assert_eq!(Dual::constant(0.).sqrt(), Dual::new(0., 0.));
        assert_eq!(Dual::constant(0.).powf(0.5), Dual::new(0., 0.));
        assert_eq!(Dual::constant(0.).ln(), Dual::new(E::NEG_INFINITY, 0.));
    }
}
