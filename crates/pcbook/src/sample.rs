//! Random catalog data for demos and tests.

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::model::{
    Cpu, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution, Screen,
    Storage, StorageDriver, laptop::Weight,
};

fn pick<'a>(choices: &[&'a str]) -> &'a str {
    choices.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

fn float(min: f64, max: f64) -> f64 {
    rand::thread_rng().gen_range(min..=max)
}

fn int(min: u32, max: u32) -> u32 {
    rand::thread_rng().gen_range(min..=max)
}

/// A random keyboard.
pub fn new_keyboard() -> Keyboard {
    let layout = *[
        KeyboardLayout::Qwerty,
        KeyboardLayout::Qwertz,
        KeyboardLayout::Azerty,
    ]
    .choose(&mut rand::thread_rng())
    .unwrap_or(&KeyboardLayout::Qwerty);
    Keyboard {
        layout: layout as i32,
        backlit: rand::thread_rng().gen_bool(0.5),
    }
}

/// A random CPU.
pub fn new_cpu() -> Cpu {
    let brand = pick(&["Intel", "AMD"]);
    let name = match brand {
        "Intel" => pick(&[
            "Xeon E-2286M",
            "Core i9-9980HK",
            "Core i7-9750H",
            "Core i5-9400F",
            "Core i3-1005G1",
        ]),
        _ => pick(&[
            "Ryzen 7 PRO 2700U",
            "Ryzen 5 PRO 3500U",
            "Ryzen 3 PRO 3200GE",
        ]),
    };
    let number_cores = int(2, 8);
    let min_ghz = float(2.0, 3.5);
    Cpu {
        brand: brand.to_string(),
        name: name.to_string(),
        number_cores,
        number_threads: int(number_cores, 12),
        min_ghz,
        max_ghz: float(min_ghz, 5.0),
    }
}

/// A random GPU.
pub fn new_gpu() -> Gpu {
    let brand = pick(&["Nvidia", "AMD"]);
    let name = match brand {
        "Nvidia" => pick(&["RTX 2060", "RTX 2070", "GTX 1660-Ti", "GTX 1070"]),
        _ => pick(&["RX 590", "RX 580", "RX 5700-XT", "RX Vega-56"]),
    };
    let min_ghz = float(1.0, 1.5);
    Gpu {
        brand: brand.to_string(),
        name: name.to_string(),
        min_ghz,
        max_ghz: float(min_ghz, 2.0),
        memory: Some(Memory::new(u64::from(int(2, 6)), MemoryUnit::Gigabyte)),
    }
}

/// Random installed memory.
pub fn new_ram() -> Memory {
    Memory::new(u64::from(int(4, 64)), MemoryUnit::Gigabyte)
}

/// A random solid-state drive.
pub fn new_ssd() -> Storage {
    Storage {
        driver: StorageDriver::Ssd as i32,
        memory: Some(Memory::new(u64::from(int(128, 1024)), MemoryUnit::Gigabyte)),
    }
}

/// A random hard drive.
pub fn new_hdd() -> Storage {
    Storage {
        driver: StorageDriver::Hdd as i32,
        memory: Some(Memory::new(u64::from(int(1, 6)), MemoryUnit::Terabyte)),
    }
}

/// A random screen.
pub fn new_screen() -> Screen {
    let height = int(1080, 4320);
    Screen {
        size_inch: float(13.0, 17.0) as f32,
        resolution: Some(Resolution {
            width: height * 16 / 9,
            height,
        }),
        panel: if rand::thread_rng().gen_bool(0.5) {
            Panel::Ips as i32
        } else {
            Panel::Oled as i32
        },
        multitouch: rand::thread_rng().gen_bool(0.5),
    }
}

/// A random laptop with a fresh id.
pub fn new_laptop() -> Laptop {
    let brand = pick(&["Apple", "Dell", "Lenovo"]);
    let name = match brand {
        "Apple" => pick(&["Macbook Air", "Macbook Pro"]),
        "Dell" => pick(&["Latitude", "Vostro", "XPS", "Alienware"]),
        _ => pick(&["Thinkpad X1", "Thinkpad P1", "Thinkpad P53"]),
    };
    Laptop {
        id: Uuid::new_v4().to_string(),
        brand: brand.to_string(),
        name: name.to_string(),
        cpu: Some(new_cpu()),
        ram: Some(new_ram()),
        gpus: vec![new_gpu()],
        storages: vec![new_ssd(), new_hdd()],
        screen: Some(new_screen()),
        keyboard: Some(new_keyboard()),
        weight: Some(Weight::WeightKg(float(1.0, 3.0))),
        price_usd: float(1500.0, 3000.0),
        release_year: int(2015, 2022),
    }
}

/// A random score between 1 and 10.
pub fn new_score() -> f64 {
    f64::from(int(1, 10))
}
