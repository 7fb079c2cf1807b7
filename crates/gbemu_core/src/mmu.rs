use std::cell::RefCell;

use crate::cpu::Bus;

/// An inclusive address range `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    min: u16,
    max: u16,
}

impl Range {
    pub fn new(min: u16, max: u16) -> Self {
        assert!(min <= max, "invalid range 0x{min:04X}..=0x{max:04X}");
        Self { min, max }
    }

    #[inline]
    pub fn contains(self, addr: u16) -> bool {
        addr >= self.min && addr <= self.max
    }

    #[inline]
    pub fn min(self) -> u16 {
        self.min
    }

    #[inline]
    pub fn max(self) -> u16 {
        self.max
    }

    /// Number of addresses covered; never zero.
    #[inline]
    pub fn size(self) -> usize {
        (self.max - self.min) as usize + 1
    }

    #[inline]
    fn overlaps(self, other: Range) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

struct MapEntry<'a> {
    target: &'a RefCell<dyn Bus + 'a>,
    target_range: Range,
    local_range: Range,
}

/// A virtual memory layer composing one or more byte-addressable stores.
///
/// Each mapping pairs a backing store with a target range (the store's own
/// address space) and a local range (this router's address space) of the same
/// size. Lookups scan mappings in registration order and delegate to the
/// first whose local range contains the address. The mapped set is static:
/// this mirrors a hardware memory map, not a general-purpose MMU, so a
/// linear scan over a handful of regions is enough.
///
/// Backing stores are borrowed through `RefCell`, so one store may back
/// several local ranges (the Game Boy's echo RAM is exactly that shape).
#[derive(Default)]
pub struct Mmu<'a> {
    entries: Vec<MapEntry<'a>>,
}

impl<'a> Mmu<'a> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a mapping from `local_range` onto `target_range` of `target`.
    ///
    /// The two ranges must be of the same size, and `local_range` must not
    /// overlap any local range registered earlier.
    pub fn map(
        &mut self,
        target: &'a RefCell<dyn Bus + 'a>,
        target_range: Range,
        local_range: Range,
    ) {
        assert_eq!(
            target_range.size(),
            local_range.size(),
            "target range 0x{:04X}..=0x{:04X} and local range 0x{:04X}..=0x{:04X} differ in size",
            target_range.min(),
            target_range.max(),
            local_range.min(),
            local_range.max(),
        );
        for e in &self.entries {
            assert!(
                !e.local_range.overlaps(local_range),
                "local range 0x{:04X}..=0x{:04X} overlaps existing mapping 0x{:04X}..=0x{:04X}",
                local_range.min(),
                local_range.max(),
                e.local_range.min(),
                e.local_range.max(),
            );
        }

        log::debug!(
            "mmu: map local 0x{:04X}..=0x{:04X} -> target 0x{:04X}..=0x{:04X}",
            local_range.min(),
            local_range.max(),
            target_range.min(),
            target_range.max(),
        );

        self.entries.push(MapEntry {
            target,
            target_range,
            local_range,
        });
    }

    fn lookup(&self, addr: u16) -> Option<&MapEntry<'a>> {
        self.entries.iter().find(|e| e.local_range.contains(addr))
    }

    fn resolve(&self, addr: u16) -> (&'a RefCell<dyn Bus + 'a>, u16) {
        let entry = self
            .lookup(addr)
            .unwrap_or_else(|| panic!("mmu: unmapped access at 0x{addr:04X}"));
        let target_addr = entry.target_range.min() + (addr - entry.local_range.min());
        (entry.target, target_addr)
    }
}

impl Bus for Mmu<'_> {
    fn read8(&mut self, addr: u16) -> u8 {
        let (target, target_addr) = self.resolve(addr);
        target.borrow_mut().read8(target_addr)
    }

    fn write8(&mut self, addr: u16, value: u8) {
        let (target, target_addr) = self.resolve(addr);
        target.borrow_mut().write8(target_addr, value)
    }

    fn is_valid(&self, addr: u16) -> bool {
        self.lookup(addr).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    // Two small stores; the first is mapped through two local windows (with
    // its halves swapped), the second sits at a disjoint local base.
    fn build<'a>(
        mem1: &'a RefCell<Memory>,
        mem2: &'a RefCell<Memory>,
    ) -> Mmu<'a> {
        let mut mmu = Mmu::new();
        mmu.map(mem1, Range::new(0x10, 0x1F), Range::new(0x00, 0x0F));
        mmu.map(mem1, Range::new(0x00, 0x0F), Range::new(0x10, 0x1F));
        mmu.map(mem2, Range::new(0x00, 0x0F), Range::new(0x100, 0x10F));
        mmu
    }

    #[test]
    fn reads_and_writes_translate_to_backing_stores() {
        let mem1 = RefCell::new(Memory::new(32));
        let mem2 = RefCell::new(Memory::new(16));
        let mut mmu = build(&mem1, &mem2);

        mmu.write8(0x00, 5);
        mmu.write8(0x01, 6);
        mmu.write8(0x15, 100);
        mmu.write8(0x100, 1);
        mmu.write8(0x103, 3);

        assert_eq!(mem1.borrow_mut().read8(0x10), 5);
        assert_eq!(mem1.borrow_mut().read8(0x11), 6);
        assert_eq!(mem1.borrow_mut().read8(0x05), 100);
        assert_eq!(mem2.borrow_mut().read8(0x00), 1);
        assert_eq!(mem2.borrow_mut().read8(0x03), 3);

        // And back through the router.
        assert_eq!(mmu.read8(0x00), 5);
        assert_eq!(mmu.read8(0x15), 100);
        assert_eq!(mmu.read8(0x103), 3);
    }

    #[test]
    fn writes_to_backing_store_are_visible_through_router() {
        let mem1 = RefCell::new(Memory::new(32));
        let mem2 = RefCell::new(Memory::new(16));
        let mut mmu = build(&mem1, &mem2);

        mem1.borrow_mut().write8(0x10, 0xAA);
        assert_eq!(mmu.read8(0x00), 0xAA);
    }

    #[test]
    fn valid_addresses_are_the_union_of_local_ranges() {
        let mem1 = RefCell::new(Memory::new(32));
        let mem2 = RefCell::new(Memory::new(16));
        let mmu = build(&mem1, &mem2);

        assert!(mmu.is_valid(0x00));
        assert!(mmu.is_valid(0x02));
        assert!(mmu.is_valid(0x0F));
        assert!(mmu.is_valid(0x10));
        assert!(mmu.is_valid(0x1F));
        assert!(mmu.is_valid(0x100));
        assert!(mmu.is_valid(0x10F));
        assert!(!mmu.is_valid(0x20));
        assert!(!mmu.is_valid(0xFF));
        assert!(!mmu.is_valid(0x110));
    }

    #[test]
    #[should_panic(expected = "unmapped access")]
    fn unmapped_access_is_fatal() {
        let mem1 = RefCell::new(Memory::new(32));
        let mem2 = RefCell::new(Memory::new(16));
        let mut mmu = build(&mem1, &mem2);
        let _ = mmu.read8(0x20);
    }

    #[test]
    #[should_panic(expected = "differ in size")]
    fn mismatched_range_sizes_are_fatal() {
        let mem = RefCell::new(Memory::new(32));
        let mut mmu = Mmu::new();
        mmu.map(&mem, Range::new(0x00, 0x0F), Range::new(0x00, 0x1F));
    }

    #[test]
    #[should_panic(expected = "overlaps existing mapping")]
    fn overlapping_local_ranges_are_fatal() {
        let mem = RefCell::new(Memory::new(32));
        let mut mmu = Mmu::new();
        mmu.map(&mem, Range::new(0x00, 0x0F), Range::new(0x00, 0x0F));
        mmu.map(&mem, Range::new(0x10, 0x1F), Range::new(0x08, 0x17));
    }

    #[test]
    #[should_panic(expected = "invalid range")]
    fn inverted_range_is_fatal() {
        let _ = Range::new(0x10, 0x0F);
    }
}
