use crate::*;
use proptest::prelude::*;
use strum::VariantArray;

#[rustfmt::skip]
impl ScalarDType {
    pub fn int_generator() -> impl Strategy<Value = Self> {
        prop_oneof![
            Just(Self::Int8), Just(Self::Int16), Just(Self::Int32), Just(Self::Int64),
            Just(Self::UInt8), Just(Self::UInt16), Just(Self::UInt32), Just(Self::UInt64),
            Just(Self::Index)
        ]
    }

    pub fn float_generator() -> impl Strategy<Value = Self> {
        prop_oneof![Just(Self::Float16), Just(Self::Float32), Just(Self::Float64)]
    }

    pub fn scalar_generator() -> impl Strategy<Value = Self> {
        proptest::sample::select(Self::VARIANTS)
    }
}
