//! Type marshaling registry
//!
//! Every native type that crosses the machine boundary does so through a pair
//! of traits chosen statically by the native type:
//!
//! - [`ToStack`] pushes a native value onto the evaluation stack
//! - [`FromStack`] tests a stack slot (`matches`) and converts it (`pull`)
//!
//! There is no runtime type registry: implementing the traits for a type is
//! the registration. [`Object`] implements both, which lets machine values
//! travel alongside primitive native types.
//!
//! # Contract
//!
//! - `matches` never raises and never touches the stack
//! - `pull` may assume `matches` held; otherwise it is a best-effort fallback
//! - `push` leaves the stack exactly one slot deeper

use crate::error::{BindResult, Error};
use crate::machine::{Kind, Machine, Results};
use crate::object::Object;

/// Convert a native value into a machine value on top of the stack.
pub trait ToStack {
    /// Push `self` onto the stack
    fn push(&self, machine: &dyn Machine);
}

/// Convert a machine value at a stack slot into a native value.
pub trait FromStack<'m>: Sized {
    /// Native type name used in error messages
    fn type_name() -> &'static str;

    /// Does the value at `index` have a compatible runtime type?
    fn matches(machine: &dyn Machine, index: i32) -> bool;

    /// Convert the value at `index`
    fn pull(machine: &'m dyn Machine, index: i32) -> Self;
}

/// Marker for the machine's nil value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nil;

// ============================================================================
// Primitive Type Implementations
// ============================================================================

impl ToStack for Nil {
    fn push(&self, machine: &dyn Machine) {
        machine.push_nil();
    }
}

impl FromStack<'_> for Nil {
    fn type_name() -> &'static str {
        "nil"
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        machine.kind(index).is_nil_or_none()
    }

    fn pull(_machine: &dyn Machine, _index: i32) -> Self {
        Nil
    }
}

impl ToStack for bool {
    fn push(&self, machine: &dyn Machine) {
        machine.push_boolean(*self);
    }
}

impl FromStack<'_> for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        machine.kind(index) == Kind::Boolean
    }

    fn pull(machine: &dyn Machine, index: i32) -> Self {
        machine.to_boolean(index)
    }
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToStack for $ty {
                fn push(&self, machine: &dyn Machine) {
                    // Lossless: every type here fits in i64
                    machine.push_integer(*self as i64);
                }
            }

            impl FromStack<'_> for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn matches(machine: &dyn Machine, index: i32) -> bool {
                    machine
                        .to_integer(index)
                        .is_some_and(|i| <$ty>::try_from(i).is_ok())
                }

                fn pull(machine: &dyn Machine, index: i32) -> Self {
                    machine
                        .to_integer(index)
                        .and_then(|i| <$ty>::try_from(i).ok())
                        .unwrap_or_default()
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32);

// Types as wide as the machine integer store their bit pattern: values above
// i64::MAX read back as negative machine integers and pull back unchanged.
macro_rules! impl_wrapping_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToStack for $ty {
                fn push(&self, machine: &dyn Machine) {
                    machine.push_integer(*self as i64);
                }
            }

            impl FromStack<'_> for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn matches(machine: &dyn Machine, index: i32) -> bool {
                    machine.to_integer(index).is_some()
                }

                fn pull(machine: &dyn Machine, index: i32) -> Self {
                    machine.to_integer(index).map_or(0, |i| i as $ty)
                }
            }
        )*
    };
}

impl_wrapping_integer!(u64, usize);

impl ToStack for f64 {
    fn push(&self, machine: &dyn Machine) {
        machine.push_number(*self);
    }
}

impl FromStack<'_> for f64 {
    fn type_name() -> &'static str {
        "f64"
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        machine.kind(index) == Kind::Number
    }

    fn pull(machine: &dyn Machine, index: i32) -> Self {
        machine.to_number(index).unwrap_or_default()
    }
}

impl ToStack for f32 {
    fn push(&self, machine: &dyn Machine) {
        machine.push_number(f64::from(*self));
    }
}

impl FromStack<'_> for f32 {
    fn type_name() -> &'static str {
        "f32"
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        machine.kind(index) == Kind::Number
    }

    fn pull(machine: &dyn Machine, index: i32) -> Self {
        machine.to_number(index).unwrap_or_default() as f32
    }
}

impl ToStack for str {
    fn push(&self, machine: &dyn Machine) {
        machine.push_string(self);
    }
}

impl ToStack for String {
    fn push(&self, machine: &dyn Machine) {
        machine.push_string(self);
    }
}

impl FromStack<'_> for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        matches!(machine.kind(index), Kind::String | Kind::Number)
    }

    fn pull(machine: &dyn Machine, index: i32) -> Self {
        machine.to_string_value(index).unwrap_or_default()
    }
}

// ============================================================================
// Generic Implementations
// ============================================================================

impl<T: ToStack + ?Sized> ToStack for &T {
    fn push(&self, machine: &dyn Machine) {
        (**self).push(machine);
    }
}

impl<T: ToStack> ToStack for Option<T> {
    fn push(&self, machine: &dyn Machine) {
        match self {
            Some(value) => value.push(machine),
            None => machine.push_nil(),
        }
    }
}

impl<'m, T: FromStack<'m>> FromStack<'m> for Option<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn matches(machine: &dyn Machine, index: i32) -> bool {
        machine.kind(index).is_nil_or_none() || T::matches(machine, index)
    }

    fn pull(machine: &'m dyn Machine, index: i32) -> Self {
        if machine.kind(index).is_nil_or_none() {
            None
        } else {
            Some(T::pull(machine, index))
        }
    }
}

// Machine values marshal as themselves: they always match, push by copying the
// anchored value and pull by anchoring the slot into a fresh handle.
impl ToStack for Object<'_> {
    fn push(&self, machine: &dyn Machine) {
        let owner = self.machine().zip(self.reference());
        match owner {
            Some((owner, reference)) if std::ptr::addr_eq(owner, machine) => {
                machine.push_ref(reference)
            }
            Some(_) => {
                debug_assert!(false, "handle pushed into a foreign machine");
                // A slot id means nothing to another machine
                machine.push_nil();
            }
            // An invalid handle has no value; keep the one-slot contract
            None => machine.push_nil(),
        }
    }
}

impl<'m> FromStack<'m> for Object<'m> {
    fn type_name() -> &'static str {
        "Object"
    }

    fn matches(_machine: &dyn Machine, _index: i32) -> bool {
        true
    }

    fn pull(machine: &'m dyn Machine, index: i32) -> Self {
        Object::from_stack(machine, index)
    }
}

// ============================================================================
// Argument packs
// ============================================================================

/// A list of call arguments, pushed left to right.
///
/// Implemented for `()` and tuples of up to twelve [`ToStack`] values.
pub trait PushArgs {
    /// Push every argument and return how many were pushed
    fn push_args(&self, machine: &dyn Machine) -> i32;
}

impl PushArgs for () {
    fn push_args(&self, _machine: &dyn Machine) -> i32 {
        0
    }
}

macro_rules! impl_push_args {
    ($count:expr; $($name:ident),+) => {
        impl<$($name: ToStack),+> PushArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn push_args(&self, machine: &dyn Machine) -> i32 {
                let ($($name,)+) = self;
                $($name.push(machine);)+
                $count
            }
        }
    };
}

impl_push_args!(1; A);
impl_push_args!(2; A, B);
impl_push_args!(3; A, B, C);
impl_push_args!(4; A, B, C, D);
impl_push_args!(5; A, B, C, D, E);
impl_push_args!(6; A, B, C, D, E, F);
impl_push_args!(7; A, B, C, D, E, F, G);
impl_push_args!(8; A, B, C, D, E, F, G, H);
impl_push_args!(9; A, B, C, D, E, F, G, H, I);
impl_push_args!(10; A, B, C, D, E, F, G, H, I, J);
impl_push_args!(11; A, B, C, D, E, F, G, H, I, J, K);
impl_push_args!(12; A, B, C, D, E, F, G, H, I, J, K, L);

// ============================================================================
// Call results
// ============================================================================

/// Declared return type of a call.
///
/// `()` asks the machine for no results at all; every [`FromStack`] type asks
/// for all results and converts the first one.
pub trait CallReturn<'m>: Sized {
    /// Result count requested from the protected call
    const RESULTS: Results;

    /// Convert the first result, found at absolute `index`
    fn collect(machine: &'m dyn Machine, index: i32) -> BindResult<Self>;
}

impl CallReturn<'_> for () {
    const RESULTS: Results = Results::None;

    fn collect(_machine: &dyn Machine, _index: i32) -> BindResult<Self> {
        Ok(())
    }
}

impl<'m, T: FromStack<'m>> CallReturn<'m> for T {
    const RESULTS: Results = Results::All;

    fn collect(machine: &'m dyn Machine, index: i32) -> BindResult<Self> {
        if T::matches(machine, index) {
            Ok(T::pull(machine, index))
        } else {
            Err(Error::ResultType {
                expected: T::type_name(),
                got: machine.kind(index),
            })
        }
    }
}
