//! Catalog data model.
//!
//! These are prost messages (standard protobuf wire format, no `.proto` file)
//! that double as the domain types. They also derive serde so they can be
//! dumped as JSON by [`crate::serializer`].

use serde::{Deserialize, Serialize};

/// Unit a [`Memory`] value is expressed in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum MemoryUnit {
    /// Unspecified; normalizes to zero bits.
    Unknown = 0,
    /// Bits
    Bit = 1,
    /// Bytes
    Byte = 2,
    /// Kibibytes
    Kilobyte = 3,
    /// Mebibytes
    Megabyte = 4,
    /// Gibibytes
    Gigabyte = 5,
    /// Tebibytes
    Terabyte = 6,
}

/// An amount of memory or storage.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Memory {
    /// Magnitude in `unit`s.
    #[prost(uint64, tag = "1")]
    pub value: u64,
    /// The [`MemoryUnit`] of `value`.
    #[prost(enumeration = "MemoryUnit", tag = "2")]
    pub unit: i32,
}

impl Memory {
    /// Create a memory amount.
    pub fn new(value: u64, unit: MemoryUnit) -> Self {
        Self {
            value,
            unit: unit as i32,
        }
    }

    /// Normalize to a bit count so amounts in different units compare.
    ///
    /// Units are binary multiples. Unknown units normalize to zero and
    /// amounts too large for a `u64` saturate.
    pub fn to_bits(&self) -> u64 {
        let shift = match self.unit() {
            MemoryUnit::Unknown => return 0,
            MemoryUnit::Bit => 0,
            MemoryUnit::Byte => 3,
            MemoryUnit::Kilobyte => 13,
            MemoryUnit::Megabyte => 23,
            MemoryUnit::Gigabyte => 33,
            MemoryUnit::Terabyte => 43,
        };
        self.value
            .checked_mul(1u64 << shift)
            .unwrap_or(u64::MAX)
    }
}

/// Central processor.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Cpu {
    /// Manufacturer, e.g. "Intel"
    #[prost(string, tag = "1")]
    pub brand: String,
    /// Model name
    #[prost(string, tag = "2")]
    pub name: String,
    /// Physical core count
    #[prost(uint32, tag = "3")]
    pub number_cores: u32,
    /// Hardware thread count
    #[prost(uint32, tag = "4")]
    pub number_threads: u32,
    /// Base clock in GHz
    #[prost(double, tag = "5")]
    pub min_ghz: f64,
    /// Boost clock in GHz
    #[prost(double, tag = "6")]
    pub max_ghz: f64,
}

/// Graphics processor.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Gpu {
    /// Manufacturer
    #[prost(string, tag = "1")]
    pub brand: String,
    /// Model name
    #[prost(string, tag = "2")]
    pub name: String,
    /// Base clock in GHz
    #[prost(double, tag = "3")]
    pub min_ghz: f64,
    /// Boost clock in GHz
    #[prost(double, tag = "4")]
    pub max_ghz: f64,
    /// Dedicated video memory
    #[prost(message, optional, tag = "5")]
    pub memory: Option<Memory>,
}

/// Kind of persistent storage device.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum StorageDriver {
    /// Unspecified
    Unknown = 0,
    /// Spinning disk
    Hdd = 1,
    /// Solid state
    Ssd = 2,
}

/// A storage device.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Storage {
    /// The [`StorageDriver`]
    #[prost(enumeration = "StorageDriver", tag = "1")]
    pub driver: i32,
    /// Capacity
    #[prost(message, optional, tag = "2")]
    pub memory: Option<Memory>,
}

/// Display panel technology.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum Panel {
    /// Unspecified
    Unknown = 0,
    /// In-plane switching LCD
    Ips = 1,
    /// Organic LED
    Oled = 2,
}

/// Pixel dimensions of a screen.
#[derive(Clone, Copy, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Resolution {
    /// Horizontal pixels
    #[prost(uint32, tag = "1")]
    pub width: u32,
    /// Vertical pixels
    #[prost(uint32, tag = "2")]
    pub height: u32,
}

/// Built-in display.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Screen {
    /// Diagonal in inches
    #[prost(float, tag = "1")]
    pub size_inch: f32,
    /// Native resolution
    #[prost(message, optional, tag = "2")]
    pub resolution: Option<Resolution>,
    /// The [`Panel`] technology
    #[prost(enumeration = "Panel", tag = "3")]
    pub panel: i32,
    /// Touch support
    #[prost(bool, tag = "4")]
    pub multitouch: bool,
}

/// Physical key layout.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum KeyboardLayout {
    /// Unspecified
    Unknown = 0,
    /// QWERTY
    Qwerty = 1,
    /// QWERTZ
    Qwertz = 2,
    /// AZERTY
    Azerty = 3,
}

/// Built-in keyboard.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Keyboard {
    /// The [`KeyboardLayout`]
    #[prost(enumeration = "KeyboardLayout", tag = "1")]
    pub layout: i32,
    /// Backlight present
    #[prost(bool, tag = "2")]
    pub backlit: bool,
}

/// A catalog entry.
///
/// `id` is a UUID string; stores assign one when it is empty and reject
/// anything that does not parse.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Laptop {
    /// Unique identifier
    #[prost(string, tag = "1")]
    pub id: String,
    /// Manufacturer
    #[prost(string, tag = "2")]
    pub brand: String,
    /// Model name
    #[prost(string, tag = "3")]
    pub name: String,
    /// Processor
    #[prost(message, optional, tag = "4")]
    pub cpu: Option<Cpu>,
    /// Installed memory
    #[prost(message, optional, tag = "5")]
    pub ram: Option<Memory>,
    /// Graphics processors
    #[prost(message, repeated, tag = "6")]
    pub gpus: Vec<Gpu>,
    /// Storage devices
    #[prost(message, repeated, tag = "7")]
    pub storages: Vec<Storage>,
    /// Display
    #[prost(message, optional, tag = "8")]
    pub screen: Option<Screen>,
    /// Keyboard
    #[prost(message, optional, tag = "9")]
    pub keyboard: Option<Keyboard>,
    /// Weight, in whichever unit the vendor quotes
    #[prost(oneof = "laptop::Weight", tags = "10, 11")]
    pub weight: Option<laptop::Weight>,
    /// List price in US dollars
    #[prost(double, tag = "12")]
    pub price_usd: f64,
    /// Year of release
    #[prost(uint32, tag = "13")]
    pub release_year: u32,
}

/// Nested types for [`Laptop`].
pub mod laptop {
    use serde::{Deserialize, Serialize};

    /// Laptop weight.
    #[derive(Clone, Copy, PartialEq, prost::Oneof, Serialize, Deserialize)]
    pub enum Weight {
        /// Kilograms
        #[prost(double, tag = "10")]
        WeightKg(f64),
        /// Pounds
        #[prost(double, tag = "11")]
        WeightLb(f64),
    }
}

/// Search thresholds. A laptop qualifies when it satisfies all of them.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Filter {
    /// Inclusive price ceiling
    #[prost(double, tag = "1")]
    pub max_price_usd: f64,
    /// Inclusive core-count floor
    #[prost(uint32, tag = "2")]
    pub min_cpu_cores: u32,
    /// Inclusive base-clock floor
    #[prost(double, tag = "3")]
    pub min_cpu_ghz: f64,
    /// Inclusive memory floor, compared as normalized bits
    #[prost(message, optional, tag = "4")]
    pub min_ram: Option<Memory>,
}

impl Filter {
    /// Returns true if `laptop` satisfies every threshold.
    ///
    /// Missing sub-messages read as their defaults, so a laptop without a
    /// CPU has zero cores and zero GHz.
    pub fn matches(&self, laptop: &Laptop) -> bool {
        if laptop.price_usd > self.max_price_usd {
            return false;
        }

        let (cores, ghz) = laptop
            .cpu
            .as_ref()
            .map_or((0, 0.0), |cpu| (cpu.number_cores, cpu.min_ghz));
        if cores < self.min_cpu_cores || ghz < self.min_cpu_ghz {
            return false;
        }

        bits(laptop.ram.as_ref()) >= bits(self.min_ram.as_ref())
    }
}

fn bits(memory: Option<&Memory>) -> u64 {
    memory.map(Memory::to_bits).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop(price: f64, cores: u32, ghz: f64, ram: Memory) -> Laptop {
        Laptop {
            cpu: Some(Cpu {
                number_cores: cores,
                min_ghz: ghz,
                ..Default::default()
            }),
            ram: Some(ram),
            price_usd: price,
            ..Default::default()
        }
    }

    fn filter() -> Filter {
        Filter {
            max_price_usd: 2000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.2,
            min_ram: Some(Memory::new(9, MemoryUnit::Gigabyte)),
        }
    }

    #[test]
    fn test_memory_normalization() {
        assert_eq!(Memory::new(1, MemoryUnit::Byte).to_bits(), 8);
        assert_eq!(Memory::new(1, MemoryUnit::Kilobyte).to_bits(), 8 * 1024);
        assert_eq!(
            Memory::new(4096, MemoryUnit::Megabyte).to_bits(),
            Memory::new(4, MemoryUnit::Gigabyte).to_bits()
        );
        assert_eq!(Memory::new(7, MemoryUnit::Unknown).to_bits(), 0);
        assert_eq!(Memory::new(u64::MAX, MemoryUnit::Terabyte).to_bits(), u64::MAX);
    }

    #[test]
    fn test_filter_accepts_qualifying_laptop() {
        let candidate = laptop(1999.0, 4, 2.5, Memory::new(16, MemoryUnit::Gigabyte));
        assert!(filter().matches(&candidate));
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let candidate = laptop(2000.0, 4, 2.2, Memory::new(9, MemoryUnit::Gigabyte));
        assert!(filter().matches(&candidate));
    }

    #[test]
    fn test_filter_rejects_each_threshold() {
        let gb16 = Memory::new(16, MemoryUnit::Gigabyte);
        assert!(!filter().matches(&laptop(2000.01, 4, 2.5, gb16.clone())));
        assert!(!filter().matches(&laptop(1999.0, 2, 2.5, gb16.clone())));
        assert!(!filter().matches(&laptop(1999.0, 4, 2.0, gb16)));
        assert!(!filter().matches(&laptop(
            1999.0,
            4,
            2.5,
            Memory::new(4096, MemoryUnit::Megabyte)
        )));
    }
}
