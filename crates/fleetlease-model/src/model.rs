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

//! # Instance Model
//!
//! The immutable description of one leasing and scheduling problem, together
//! with everything the solver derives from it once at setup: the
//! type-to-equipment map, the instances of flexible orders, candidate shift
//! windows per order, per-equipment shift and lease-term limits, travel costs
//! and the customers that can never be served.
//!
//! Construction goes through [`InstanceBuilder`]; the raw inputs are plain
//! spec structs ([`EquipmentSpec`], [`OrderSpec`]) and the derivation is
//! steered by [`ModelOptions`].

use crate::{
    index::{CustomerIndex, EquipmentIndex, GroupIndex, OrderIndex},
    location::{DistanceMetric, Location},
    rent::RentFunction,
};
use fleetlease_core::math::window::TimeWindow;
use rustc_hash::FxHashMap;

/// Cost added to every move between two distinct entities.
pub const DEFAULT_BASE_SCHEDULE_COST: f64 = 2.0;

/// Options that shape how an instance is derived from its raw inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// An equipment unit may serve the same order in several separate shifts.
    pub allow_revisit: bool,
    /// Orders must be served in one piece by one unit.
    pub forbid_split: bool,
    /// Expand flexible orders into their admissible placements.
    pub flexible: bool,
    /// Global cap on lease terms per unit; `None` means the horizon.
    pub max_lease_terms: Option<usize>,
    /// Cap on the number of rent segments considered per unit.
    pub max_segments: Option<usize>,
    /// Added to the distance of every move between two distinct entities.
    pub base_schedule_cost: f64,
    pub metric: DistanceMetric,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            allow_revisit: false,
            forbid_split: false,
            flexible: true,
            max_lease_terms: None,
            max_segments: None,
            base_schedule_cost: DEFAULT_BASE_SCHEDULE_COST,
            metric: DistanceMetric::Manhattan,
        }
    }
}

impl ModelOptions {
    #[inline]
    pub fn allow_revisit(mut self, yes: bool) -> Self {
        self.allow_revisit = yes;
        self
    }

    #[inline]
    pub fn forbid_split(mut self, yes: bool) -> Self {
        self.forbid_split = yes;
        self
    }

    #[inline]
    pub fn flexible(mut self, yes: bool) -> Self {
        self.flexible = yes;
        self
    }

    #[inline]
    pub fn max_lease_terms(mut self, terms: usize) -> Self {
        self.max_lease_terms = Some(terms);
        self
    }

    #[inline]
    pub fn max_segments(mut self, segments: usize) -> Self {
        self.max_segments = Some(segments);
        self
    }

    #[inline]
    pub fn base_schedule_cost(mut self, cost: f64) -> Self {
        self.base_schedule_cost = cost;
        self
    }

    #[inline]
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Raw description of one equipment unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentSpec {
    pub equipment_type: usize,
    pub window: TimeWindow,
    pub rent: RentFunction,
    pub location: Option<Location>,
    pub max_lease_terms: Option<usize>,
    pub max_shifts: Option<usize>,
}

impl EquipmentSpec {
    #[inline]
    pub fn new(equipment_type: usize, window: TimeWindow, rent: RentFunction) -> Self {
        Self {
            equipment_type,
            window,
            rent,
            location: None,
            max_lease_terms: None,
            max_shifts: None,
        }
    }

    #[inline]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[inline]
    pub fn with_max_lease_terms(mut self, terms: usize) -> Self {
        self.max_lease_terms = Some(terms);
        self
    }

    #[inline]
    pub fn with_max_shifts(mut self, shifts: usize) -> Self {
        self.max_shifts = Some(shifts);
        self
    }
}

/// A window that may be placed anywhere inside `(earliest, latest]` as long
/// as it lasts `min_duration` periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlexibleWindow {
    pub earliest: usize,
    pub latest: usize,
    pub min_duration: usize,
}

impl FlexibleWindow {
    #[inline]
    pub const fn new(earliest: usize, latest: usize, min_duration: usize) -> Self {
        Self {
            earliest,
            latest,
            min_duration,
        }
    }

    /// All placements `(earliest + n, earliest + n + min_duration]`.
    pub fn placements(&self) -> impl Iterator<Item = TimeWindow> + '_ {
        let slack = (self.latest - self.earliest).saturating_sub(self.min_duration);
        (0..=slack).map(move |n| {
            TimeWindow::new_unchecked(
                self.earliest + n,
                self.earliest + n + self.min_duration,
            )
        })
    }
}

/// Raw description of one order submitted by a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub customer: CustomerIndex,
    pub equipment_type: usize,
    pub window: TimeWindow,
    pub flexible: Option<FlexibleWindow>,
    pub setup_cost: f64,
    pub switch_cost: f64,
    pub location: Option<Location>,
}

impl OrderSpec {
    #[inline]
    pub fn new(customer: CustomerIndex, equipment_type: usize, window: TimeWindow) -> Self {
        Self {
            customer,
            equipment_type,
            window,
            flexible: None,
            setup_cost: 0.0,
            switch_cost: 0.0,
            location: None,
        }
    }

    /// A flexible order; its nominal window is the earliest placement.
    #[inline]
    pub fn flexible(customer: CustomerIndex, equipment_type: usize, flex: FlexibleWindow) -> Self {
        let window = TimeWindow::new(flex.earliest, flex.earliest + flex.min_duration);
        Self {
            flexible: Some(flex),
            ..Self::new(customer, equipment_type, window)
        }
    }

    #[inline]
    pub fn with_setup_cost(mut self, cost: f64) -> Self {
        self.setup_cost = cost;
        self
    }

    #[inline]
    pub fn with_switch_cost(mut self, cost: f64) -> Self {
        self.switch_cost = cost;
        self
    }

    #[inline]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Errors raised while deriving an [`Instance`].
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceBuildError {
    /// The horizon has no periods.
    EmptyHorizon,
    /// An equipment availability window leaves the horizon.
    EquipmentOutsideHorizon {
        equipment: EquipmentIndex,
        window: TimeWindow,
    },
    /// An order window is empty or leaves the horizon.
    InvalidOrderWindow { group: GroupIndex, window: TimeWindow },
    /// A flexible window is shorter than its minimum duration.
    InvalidFlexibleWindow { group: GroupIndex },
    /// An order references a customer that was never added.
    UnknownCustomer {
        group: GroupIndex,
        customer: CustomerIndex,
    },
    /// Revenue or a cost is negative or not finite.
    InvalidAmount { what: &'static str, index: usize },
}

impl std::fmt::Display for InstanceBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyHorizon => write!(f, "the planning horizon must have at least one period"),
            Self::EquipmentOutsideHorizon { equipment, window } => {
                write!(f, "{} window {} leaves the horizon", equipment, window)
            }
            Self::InvalidOrderWindow { group, window } => {
                write!(f, "order {} has an invalid window {}", group, window)
            }
            Self::InvalidFlexibleWindow { group } => {
                write!(f, "flexible order {} is shorter than its minimum duration", group)
            }
            Self::UnknownCustomer { group, customer } => {
                write!(f, "order {} references unknown {}", group, customer)
            }
            Self::InvalidAmount { what, index } => {
                write!(f, "{} of entry {} is negative or not finite", what, index)
            }
        }
    }
}

impl std::error::Error for InstanceBuildError {}

/// A derived equipment unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Equipment {
    index: EquipmentIndex,
    equipment_type: usize,
    window: TimeWindow,
    rent: RentFunction,
    location: Option<Location>,
    max_lease_terms: usize,
    max_shifts: usize,
    orders: Vec<OrderIndex>,
    time_borders: Vec<usize>,
}

impl Equipment {
    #[inline]
    pub fn index(&self) -> EquipmentIndex {
        self.index
    }

    #[inline]
    pub fn equipment_type(&self) -> usize {
        self.equipment_type
    }

    /// Availability window of the unit.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    #[inline]
    pub fn rent(&self) -> &RentFunction {
        &self.rent
    }

    #[inline]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Maximum number of lease terms `q`.
    #[inline]
    pub fn max_lease_terms(&self) -> usize {
        self.max_lease_terms
    }

    /// Maximum number of shifts `m`.
    #[inline]
    pub fn max_shifts(&self) -> usize {
        self.max_shifts
    }

    /// Compatible order instances sorted by window.
    #[inline]
    pub fn orders(&self) -> &[OrderIndex] {
        &self.orders
    }

    /// Sorted begins and ends of compatible orders inside the availability window.
    #[inline]
    pub fn time_borders(&self) -> &[usize] {
        &self.time_borders
    }
}

/// A candidate shift window of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkWindow {
    pub window: TimeWindow,
    /// The largest number of pieces the order can be split into when this
    /// window is one of them.
    pub max_pieces: usize,
}

/// A derived order instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerOrder {
    index: OrderIndex,
    customer: CustomerIndex,
    group: GroupIndex,
    equipment_type: usize,
    window: TimeWindow,
    setup_cost: f64,
    switch_cost: f64,
    location: Option<Location>,
    work_windows: Vec<WorkWindow>,
    equipment: Vec<EquipmentIndex>,
}

impl CustomerOrder {
    #[inline]
    pub fn index(&self) -> OrderIndex {
        self.index
    }

    #[inline]
    pub fn customer(&self) -> CustomerIndex {
        self.customer
    }

    #[inline]
    pub fn group(&self) -> GroupIndex {
        self.group
    }

    #[inline]
    pub fn equipment_type(&self) -> usize {
        self.equipment_type
    }

    #[inline]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    #[inline]
    pub fn setup_cost(&self) -> f64 {
        self.setup_cost
    }

    #[inline]
    pub fn switch_cost(&self) -> f64 {
        self.switch_cost
    }

    #[inline]
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Candidate shift windows, full window first.
    #[inline]
    pub fn work_windows(&self) -> &[WorkWindow] {
        &self.work_windows
    }

    /// Compatible equipment units.
    #[inline]
    pub fn equipment(&self) -> &[EquipmentIndex] {
        &self.equipment
    }
}

/// A customer and the order groups that must all be served to earn its revenue.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    index: CustomerIndex,
    revenue: f64,
    groups: Vec<GroupIndex>,
    average_revenue: f64,
    rejected: bool,
}

impl Customer {
    #[inline]
    pub fn index(&self) -> CustomerIndex {
        self.index
    }

    #[inline]
    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    #[inline]
    pub fn groups(&self) -> &[GroupIndex] {
        &self.groups
    }

    /// Revenue per requested period.
    #[inline]
    pub fn average_revenue(&self) -> f64 {
        self.average_revenue
    }

    /// `true` if some order of this customer can never be served.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }
}

/// The mutually exclusive instances of one submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderGroup {
    index: GroupIndex,
    customer: CustomerIndex,
    instances: Vec<OrderIndex>,
}

impl OrderGroup {
    #[inline]
    pub fn index(&self) -> GroupIndex {
        self.index
    }

    #[inline]
    pub fn customer(&self) -> CustomerIndex {
        self.customer
    }

    #[inline]
    pub fn instances(&self) -> &[OrderIndex] {
        &self.instances
    }

    #[inline]
    pub fn is_flexible(&self) -> bool {
        self.instances.len() > 1
    }
}

/// The derived, immutable problem instance.
#[derive(Debug, Clone)]
pub struct Instance {
    horizon: usize,
    options: ModelOptions,
    equipment: Vec<Equipment>,
    orders: Vec<CustomerOrder>,
    customers: Vec<Customer>,
    groups: Vec<OrderGroup>,
    type_equipment: FxHashMap<usize, Vec<EquipmentIndex>>,
    equipment_travel: Vec<Vec<f64>>,
    order_travel: Vec<Vec<f64>>,
    flexible: bool,
}

impl Instance {
    /// Number of periods `T`.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[inline]
    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    #[inline]
    pub fn num_equipment(&self) -> usize {
        self.equipment.len()
    }

    #[inline]
    pub fn num_orders(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn num_customers(&self) -> usize {
        self.customers.len()
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn equipment(&self, index: EquipmentIndex) -> &Equipment {
        debug_assert!(
            index.get() < self.equipment.len(),
            "called `Instance::equipment` with index out of bounds: the len is {} but the index is {}",
            self.equipment.len(),
            index.get()
        );
        &self.equipment[index.get()]
    }

    #[inline]
    pub fn order(&self, index: OrderIndex) -> &CustomerOrder {
        debug_assert!(
            index.get() < self.orders.len(),
            "called `Instance::order` with index out of bounds: the len is {} but the index is {}",
            self.orders.len(),
            index.get()
        );
        &self.orders[index.get()]
    }

    #[inline]
    pub fn customer(&self, index: CustomerIndex) -> &Customer {
        &self.customers[index.get()]
    }

    #[inline]
    pub fn group(&self, index: GroupIndex) -> &OrderGroup {
        &self.groups[index.get()]
    }

    #[inline]
    pub fn equipments(&self) -> &[Equipment] {
        &self.equipment
    }

    #[inline]
    pub fn orders(&self) -> &[CustomerOrder] {
        &self.orders
    }

    #[inline]
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    #[inline]
    pub fn groups(&self) -> &[OrderGroup] {
        &self.groups
    }

    /// Equipment units of `equipment_type`.
    #[inline]
    pub fn equipment_of_type(&self, equipment_type: usize) -> &[EquipmentIndex] {
        self.type_equipment
            .get(&equipment_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` if at least one order group has more than one instance.
    #[inline]
    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    /// Instances sharing the group of `order`, including `order` itself.
    #[inline]
    pub fn siblings(&self, order: OrderIndex) -> &[OrderIndex] {
        self.group(self.order(order).group()).instances()
    }

    /// Travel cost of moving to `order`, from `previous` or from the unit's
    /// own location when `previous` is `None`.
    #[inline]
    pub fn travel_cost(
        &self,
        equipment: EquipmentIndex,
        previous: Option<OrderIndex>,
        order: OrderIndex,
    ) -> f64 {
        match previous {
            Some(prev) => self.order_travel[prev.get()][order.get()],
            None => self.equipment_travel[equipment.get()][order.get()],
        }
    }

    /// Fixed cost of a shift of `order` over `window`: the setup cost when
    /// positive, otherwise the switch cost for a shift that starts after the
    /// order begins.
    #[inline]
    pub fn fixed_cost(&self, order: OrderIndex, window: TimeWindow) -> f64 {
        let o = self.order(order);
        if o.setup_cost > 0.0 {
            o.setup_cost
        } else if window.begin() > o.window.begin() {
            o.switch_cost
        } else {
            0.0
        }
    }

    /// Candidate shift windows of `order` inside the availability of `equipment`.
    pub fn work_windows_on(
        &self,
        equipment: EquipmentIndex,
        order: OrderIndex,
    ) -> impl Iterator<Item = WorkWindow> + '_ {
        let available = self.equipment(equipment).window();
        self.order(order)
            .work_windows()
            .iter()
            .copied()
            .filter(move |w| available.contains(w.window))
    }

    /// Customers that must be rejected because an order cannot be served at all.
    pub fn rejected_customers(&self) -> impl Iterator<Item = CustomerIndex> + '_ {
        self.customers
            .iter()
            .filter(|c| c.rejected)
            .map(|c| c.index)
    }

    /// Total revenue of all customers that are not rejected.
    pub fn attainable_revenue(&self) -> f64 {
        self.customers
            .iter()
            .filter(|c| !c.rejected)
            .map(|c| c.revenue)
            .sum()
    }
}

/// Builder for an [`Instance`].
///
/// ```rust
/// # use fleetlease_model::model::{InstanceBuilder, EquipmentSpec, OrderSpec, ModelOptions};
/// # use fleetlease_model::rent::RentFunction;
/// # use fleetlease_core::math::window::TimeWindow;
///
/// let mut builder = InstanceBuilder::new(5);
/// builder.add_equipment(EquipmentSpec::new(0, TimeWindow::new(0, 5), RentFunction::flat(10.0, 5)));
/// let a = builder.add_customer(50.0);
/// builder.add_order(OrderSpec::new(a, 0, TimeWindow::new(0, 3)));
/// let instance = builder.build(&ModelOptions::default()).unwrap();
/// assert_eq!(instance.num_orders(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstanceBuilder {
    horizon: usize,
    equipment: Vec<EquipmentSpec>,
    revenues: Vec<f64>,
    orders: Vec<OrderSpec>,
}

impl InstanceBuilder {
    #[inline]
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }

    #[inline]
    pub fn add_equipment(&mut self, spec: EquipmentSpec) -> EquipmentIndex {
        self.equipment.push(spec);
        EquipmentIndex::new(self.equipment.len() - 1)
    }

    #[inline]
    pub fn add_customer(&mut self, revenue: f64) -> CustomerIndex {
        self.revenues.push(revenue);
        CustomerIndex::new(self.revenues.len() - 1)
    }

    #[inline]
    pub fn add_order(&mut self, spec: OrderSpec) -> GroupIndex {
        self.orders.push(spec);
        GroupIndex::new(self.orders.len() - 1)
    }

    fn validate(&self) -> Result<(), InstanceBuildError> {
        if self.horizon == 0 {
            return Err(InstanceBuildError::EmptyHorizon);
        }
        for (i, e) in self.equipment.iter().enumerate() {
            if e.window.end() > self.horizon || e.window.is_empty() {
                return Err(InstanceBuildError::EquipmentOutsideHorizon {
                    equipment: EquipmentIndex::new(i),
                    window: e.window,
                });
            }
        }
        for (p, r) in self.revenues.iter().enumerate() {
            if !r.is_finite() || *r < 0.0 {
                return Err(InstanceBuildError::InvalidAmount {
                    what: "revenue",
                    index: p,
                });
            }
        }
        for (g, o) in self.orders.iter().enumerate() {
            let group = GroupIndex::new(g);
            if o.customer.get() >= self.revenues.len() {
                return Err(InstanceBuildError::UnknownCustomer {
                    group,
                    customer: o.customer,
                });
            }
            if o.window.is_empty() || o.window.end() > self.horizon {
                return Err(InstanceBuildError::InvalidOrderWindow {
                    group,
                    window: o.window,
                });
            }
            if let Some(flex) = o.flexible
                && (flex.min_duration == 0
                    || flex.latest > self.horizon
                    || flex.latest < flex.earliest + flex.min_duration)
            {
                return Err(InstanceBuildError::InvalidFlexibleWindow { group });
            }
            if !(o.setup_cost.is_finite() && o.switch_cost.is_finite())
                || o.setup_cost < 0.0
                || o.switch_cost < 0.0
            {
                return Err(InstanceBuildError::InvalidAmount {
                    what: "order cost",
                    index: g,
                });
            }
        }
        Ok(())
    }

    /// Validates the inputs and derives the instance.
    ///
    /// # Errors
    ///
    /// Returns an [`InstanceBuildError`] describing the first invalid input.
    pub fn build(self, options: &ModelOptions) -> Result<Instance, InstanceBuildError> {
        self.validate()?;
        let horizon = self.horizon;

        let mut type_equipment: FxHashMap<usize, Vec<EquipmentIndex>> = FxHashMap::default();
        for (i, e) in self.equipment.iter().enumerate() {
            type_equipment
                .entry(e.equipment_type)
                .or_default()
                .push(EquipmentIndex::new(i));
        }

        // Expand every submitted order into its instances.
        let mut orders: Vec<CustomerOrder> = Vec::new();
        let mut groups: Vec<OrderGroup> = Vec::with_capacity(self.orders.len());
        for (g, spec) in self.orders.iter().enumerate() {
            let group = GroupIndex::new(g);
            let windows: Vec<TimeWindow> = match spec.flexible {
                Some(flex) if options.flexible => flex.placements().collect(),
                _ => vec![spec.window],
            };
            let mut instances = Vec::with_capacity(windows.len());
            for window in windows {
                let index = OrderIndex::new(orders.len());
                let equipment = type_equipment
                    .get(&spec.equipment_type)
                    .map(|units| {
                        units
                            .iter()
                            .copied()
                            .filter(|&i| {
                                self.equipment[i.get()].window.contains(window)
                                    || (!options.forbid_split
                                        && self.equipment[i.get()].window.overlaps(window))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                orders.push(CustomerOrder {
                    index,
                    customer: spec.customer,
                    group,
                    equipment_type: spec.equipment_type,
                    window,
                    setup_cost: spec.setup_cost,
                    switch_cost: spec.switch_cost,
                    location: spec.location,
                    work_windows: Vec::new(),
                    equipment,
                });
                instances.push(index);
            }
            groups.push(OrderGroup {
                index: group,
                customer: spec.customer,
                instances,
            });
        }
        let flexible = groups.iter().any(OrderGroup::is_flexible);

        // Candidate shift windows per order instance.
        for j in 0..orders.len() {
            let order = &orders[j];
            let units = type_equipment
                .get(&order.equipment_type)
                .map_or(0, Vec::len);
            let work_windows = if options.forbid_split || units <= 1 {
                vec![WorkWindow {
                    window: order.window,
                    max_pieces: 1,
                }]
            } else {
                let mut borders = vec![order.window.begin(), order.window.end()];
                for other in orders.iter() {
                    if other.group == order.group || other.equipment_type != order.equipment_type {
                        continue;
                    }
                    for t in [other.window.begin(), other.window.end()] {
                        if order.window.begin() < t && t < order.window.end() {
                            borders.push(t);
                        }
                    }
                }
                split_windows(&mut borders)
            };
            orders[j].work_windows = work_windows;
        }

        let mut customers: Vec<Customer> = self
            .revenues
            .iter()
            .enumerate()
            .map(|(p, &revenue)| Customer {
                index: CustomerIndex::new(p),
                revenue,
                groups: Vec::new(),
                average_revenue: 0.0,
                rejected: false,
            })
            .collect();
        for group in &groups {
            let c = &mut customers[group.customer.get()];
            c.groups.push(group.index);
            if group
                .instances
                .iter()
                .all(|&j| orders[j.get()].equipment.is_empty())
            {
                c.rejected = true;
            }
        }
        for c in customers.iter_mut() {
            let requested: usize = c
                .groups
                .iter()
                .filter_map(|g| groups[g.get()].instances.first())
                .map(|j| orders[j.get()].window.len())
                .sum();
            c.average_revenue = if requested > 0 {
                c.revenue / requested as f64
            } else {
                0.0
            };
            if c.rejected {
                tracing::debug!(customer = %c.index, "customer rejected during preprocessing");
            }
        }

        let max_terms_global = options.max_lease_terms.filter(|&q| q > 0).unwrap_or(horizon);
        let equipment: Vec<Equipment> = self
            .equipment
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let index = EquipmentIndex::new(i);
                let mut compatible: Vec<OrderIndex> = orders
                    .iter()
                    .filter(|o| o.equipment.contains(&index))
                    .map(|o| o.index)
                    .collect();
                compatible.sort_by_key(|j| {
                    let w = orders[j.get()].window;
                    (w.begin(), w.end(), j.get())
                });
                let mut time_borders: Vec<usize> = compatible
                    .iter()
                    .flat_map(|j| {
                        let w = orders[j.get()].window;
                        [w.begin(), w.end()]
                    })
                    .map(|t| t.clamp(spec.window.begin(), spec.window.end()))
                    .collect();
                time_borders.sort_unstable();
                time_borders.dedup();
                let elementary = time_borders.len().saturating_sub(1);
                let mut max_shifts = if options.allow_revisit {
                    elementary
                } else {
                    horizon.min(compatible.len())
                };
                if let Some(m) = spec.max_shifts {
                    max_shifts = max_shifts.min(m);
                }
                let terms = spec.max_lease_terms.unwrap_or(max_terms_global);
                let max_lease_terms = terms.min(max_shifts);
                let rent = match options.max_segments {
                    Some(n) if n > 0 => spec.rent.truncated(n),
                    _ => spec.rent.clone(),
                };
                Equipment {
                    index,
                    equipment_type: spec.equipment_type,
                    window: spec.window,
                    rent,
                    location: spec.location,
                    max_lease_terms,
                    max_shifts,
                    orders: compatible,
                    time_borders,
                }
            })
            .collect();

        let base = options.base_schedule_cost;
        let distance = |a: Option<Location>, b: Option<Location>| match (a, b) {
            (Some(a), Some(b)) => a.distance(b, options.metric),
            _ => 0.0,
        };
        let equipment_travel: Vec<Vec<f64>> = equipment
            .iter()
            .map(|e| {
                orders
                    .iter()
                    .map(|o| distance(e.location, o.location) + base)
                    .collect()
            })
            .collect();
        let order_travel: Vec<Vec<f64>> = orders
            .iter()
            .map(|a| {
                orders
                    .iter()
                    .map(|b| {
                        if a.index == b.index {
                            0.0
                        } else {
                            distance(a.location, b.location) + base
                        }
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(
            equipment = equipment.len(),
            orders = orders.len(),
            customers = customers.len(),
            flexible,
            "instance derived"
        );

        Ok(Instance {
            horizon,
            options: options.clone(),
            equipment,
            orders,
            customers,
            groups,
            type_equipment,
            equipment_travel,
            order_travel,
            flexible,
        })
    }
}

/// Every contiguous run of elementary border intervals, tagged with the
/// largest number of pieces it can take part in.
fn split_windows(borders: &mut Vec<usize>) -> Vec<WorkWindow> {
    borders.sort_unstable();
    borders.dedup();
    let len = borders.len();
    let mut windows: Vec<WorkWindow> = Vec::new();
    for nx in 1..len {
        for s in 0..nx {
            let window = TimeWindow::new_unchecked(borders[s], borders[s + len - nx]);
            if !windows.iter().any(|w| w.window == window) {
                windows.push(WorkWindow {
                    window,
                    max_pieces: nx,
                });
            }
        }
    }
    windows
}
