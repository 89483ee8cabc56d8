// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use fleetlease_core::utils::index::{TypedIndex, TypedIndexTag};

/// A tag type for equipment indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EquipmentIndexTag;

impl TypedIndexTag for EquipmentIndexTag {
    const NAME: &'static str = "EquipmentIndex";
}

/// A typed index for equipment units.
pub type EquipmentIndex = TypedIndex<EquipmentIndexTag>;

/// A tag type for order indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OrderIndexTag;

impl TypedIndexTag for OrderIndexTag {
    const NAME: &'static str = "OrderIndex";
}

/// A typed index for order instances. A flexible order contributes one
/// instance per admissible placement of its window; every other order
/// contributes exactly one.
pub type OrderIndex = TypedIndex<OrderIndexTag>;

/// A tag type for customer indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CustomerIndexTag;

impl TypedIndexTag for CustomerIndexTag {
    const NAME: &'static str = "CustomerIndex";
}

/// A typed index for customers.
pub type CustomerIndex = TypedIndex<CustomerIndexTag>;

/// A tag type for order group indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GroupIndexTag;

impl TypedIndexTag for GroupIndexTag {
    const NAME: &'static str = "GroupIndex";
}

/// A typed index for order groups. Each order as submitted by a customer
/// forms one group; its instances are mutually exclusive.
pub type GroupIndex = TypedIndex<GroupIndexTag>;
