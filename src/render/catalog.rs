/// A service category on the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub name: &'static str,
    pub icon: &'static str,
}

pub const CATEGORIES: [Category; 6] = [
    Category { name: "House Cleaning", icon: "🧹" },
    Category { name: "Teknisi", icon: "🔧" },
    Category { name: "Jasa Antar", icon: "🚚" },
    Category { name: "Tukang Kebun", icon: "🧑‍🌾" },
    Category { name: "Tukar Air", icon: "💧" },
    Category { name: "Tukang Listrik", icon: "⚡" },
];

pub const BRAND: &str = "Dibantuin";
pub const TAGLINE: &str = "Butuh sesuatu? Sini dibantuin.";
pub const SEARCH_PLACEHOLDER: &str = "Cari layanan...";
pub const CATEGORIES_TITLE: &str = "Kategori Layanan";
pub const VENDORS_TITLE: &str = "Vendor Pilihan";
pub const LOADING_TEXT: &str = "Memuat vendor...";
pub const EMPTY_TEXT: &str = "Belum ada vendor yang terdaftar. Anda bisa tambahkan vendor baru.";
pub const ABOUT_TITLE: &str = "Tentang Dibantuin";
pub const ABOUT_TEXT: &str = "Dibantuin adalah platform inovatif yang dirancang untuk menghubungkan \
Anda dengan berbagai layanan profesional yang Anda butuhkan, mulai dari kebersihan rumah, \
perbaikan teknis, hingga perawatan taman.";
pub const FOOTER_TEXT: &str = "Crafted with ❤️ by Laniakea Digital // Naimy.";
