//! Real Accra locations (from OpenStreetMap), used as pickup points.

pub struct Place {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn place(name: &'static str, lat: f64, lon: f64) -> Place {
    Place { name, lat, lon }
}

pub const MAKOLA_MARKET: Place = place("Makola Market", 5.5486, -0.2076);
pub const NKRUMAH_MAUSOLEUM: Place = place("Kwame Nkrumah Mausoleum", 5.5440, -0.2016);
pub const INDEPENDENCE_SQUARE: Place = place("Independence Square", 5.5483, -0.1925);
pub const OXFORD_STREET: Place = place("Oxford Street, Osu", 5.5560, -0.1820);
pub const LABADI_BEACH: Place = place("Labadi Beach", 5.5600, -0.1450);
pub const TESHIE: Place = place("Teshie", 5.5830, -0.1070);
pub const KANESHIE_MARKET: Place = place("Kaneshie Market", 5.5659, -0.2353);
pub const KWAME_NKRUMAH_CIRCLE: Place = place("Kwame Nkrumah Circle", 5.5700, -0.2150);
pub const DZORWULU: Place = place("Dzorwulu", 5.6050, -0.2000);
pub const KOTOKA_AIRPORT: Place = place("Kotoka International Airport", 5.6052, -0.1668);
pub const ACCRA_MALL: Place = place("Accra Mall", 5.6212, -0.1737);
pub const ACHIMOTA_MALL: Place = place("Achimota Mall", 5.6270, -0.2240);
pub const EAST_LEGON: Place = place("East Legon", 5.6350, -0.1600);
pub const UNIVERSITY_OF_GHANA: Place = place("University of Ghana, Legon", 5.6508, -0.1870);
pub const MADINA_MARKET: Place = place("Madina Market", 5.6685, -0.1650);

pub const ALL: [&Place; 15] = [
    &MAKOLA_MARKET,
    &NKRUMAH_MAUSOLEUM,
    &INDEPENDENCE_SQUARE,
    &OXFORD_STREET,
    &LABADI_BEACH,
    &TESHIE,
    &KANESHIE_MARKET,
    &KWAME_NKRUMAH_CIRCLE,
    &DZORWULU,
    &KOTOKA_AIRPORT,
    &ACCRA_MALL,
    &ACHIMOTA_MALL,
    &EAST_LEGON,
    &UNIVERSITY_OF_GHANA,
    &MADINA_MARKET,
];
