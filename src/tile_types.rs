/// Broad category of a tile type, used for placement rules and overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileGroup {
    /// Off-map filler; never stored in the world.
    Blank,
    Bare,
    /// Non-origin cell of a multi-tile building.
    Used,
    Water,
    PowerLine,
    PowerSource,
    Substation,
    Residence,
    Market,
    Road,
    Track,
    Rail,
    Industry,
    Farm,
    Mine,
    Park,
    Monument,
    Civic,
    Fire,
    Burnt,
    Port,
}

/// Catalog row: what a tile type is called, which image draws it and how
/// large a building of this type is.
#[derive(Debug, Clone, Copy)]
pub struct TileKindInfo {
    pub name: &'static str,
    pub file: Option<&'static str>,
    pub group: TileGroup,
    pub size: u8,
}

/// Index into [`CATALOG`]. Also the index of the type's texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileType(pub u16);

impl TileType {
    pub const BLANK: Self = Self(0);
    pub const GREEN: Self = Self(1);
    pub const USED: Self = Self(2);
    pub const WATER: Self = Self(3);
    pub const ROAD: Self = Self(20);
    pub const PORT: Self = Self(60);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Catalog row, or None for an index past the end of the table.
    pub fn info(self) -> Option<&'static TileKindInfo> {
        CATALOG.get(self.index())
    }

    pub fn group(self) -> TileGroup {
        self.info().map(|i| i.group).unwrap_or(TileGroup::Blank)
    }

    /// Default footprint edge length for newly placed buildings of this type.
    pub fn default_size(self) -> i32 {
        self.info().map(|i| i32::from(i.size)).unwrap_or(1)
    }

    /// Look a type up by its catalog name.
    pub fn by_name(name: &str) -> Option<Self> {
        CATALOG
            .iter()
            .position(|i| i.name == name)
            .map(|i| Self(i as u16))
    }

    /// Every catalog entry, in slot order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CATALOG.len()).map(|i| Self(i as u16))
    }
}

const fn kind(name: &'static str, file: &'static str, group: TileGroup, size: u8) -> TileKindInfo {
    TileKindInfo {
        name,
        file: Some(file),
        group,
        size,
    }
}

/// Every tile type the view knows how to draw, indexed by [`TileType`].
pub static CATALOG: &[TileKindInfo] = &[
    kind("blank", "blank.png", TileGroup::Blank, 1),
    kind("green", "green.png", TileGroup::Bare, 1),
    TileKindInfo {
        name: "used",
        file: None,
        group: TileGroup::Used,
        size: 1,
    },
    kind("water", "water.png", TileGroup::Water, 1),
    kind("water_d", "waterd.png", TileGroup::Water, 1),
    kind("water_r", "waterr.png", TileGroup::Water, 1),
    kind("water_u", "wateru.png", TileGroup::Water, 1),
    kind("water_l", "waterl.png", TileGroup::Water, 1),
    kind("water_lr", "waterlr.png", TileGroup::Water, 1),
    kind("water_ud", "waterud.png", TileGroup::Water, 1),
    kind("water_ld", "waterld.png", TileGroup::Water, 1),
    kind("water_rd", "waterrd.png", TileGroup::Water, 1),
    kind("water_lu", "waterlu.png", TileGroup::Water, 1),
    kind("water_ur", "waterur.png", TileGroup::Water, 1),
    kind("water_lud", "waterlud.png", TileGroup::Water, 1),
    kind("water_lrd", "waterlrd.png", TileGroup::Water, 1),
    kind("water_lur", "waterlur.png", TileGroup::Water, 1),
    kind("water_urd", "waterurd.png", TileGroup::Water, 1),
    kind("water_lurd", "waterlurd.png", TileGroup::Water, 1),
    kind("burnt", "burnt_land.png", TileGroup::Burnt, 1),
    kind("road_lr", "roadlr.png", TileGroup::Road, 1),
    kind("road_lu", "roadlu.png", TileGroup::Road, 1),
    kind("road_ld", "roadld.png", TileGroup::Road, 1),
    kind("road_ud", "roadud.png", TileGroup::Road, 1),
    kind("road_ur", "roadur.png", TileGroup::Road, 1),
    kind("road_dr", "roaddr.png", TileGroup::Road, 1),
    kind("road_ludr", "roadludr.png", TileGroup::Road, 1),
    kind("track_lr", "tracklr.png", TileGroup::Track, 1),
    kind("track_ud", "trackud.png", TileGroup::Track, 1),
    kind("track_ludr", "trackludr.png", TileGroup::Track, 1),
    kind("rail_lr", "raillr.png", TileGroup::Rail, 1),
    kind("rail_ud", "railud.png", TileGroup::Rail, 1),
    kind("rail_ludr", "railludr.png", TileGroup::Rail, 1),
    kind("powerl_h_l", "powerlhl.png", TileGroup::PowerLine, 1),
    kind("powerl_v_l", "powerlvl.png", TileGroup::PowerLine, 1),
    kind("powerl_h_d", "powerlhd.png", TileGroup::PowerLine, 1),
    kind("powerl_v_d", "powerlvd.png", TileGroup::PowerLine, 1),
    kind("powers_solar", "powerssolar.png", TileGroup::PowerSource, 4),
    kind("powers_coal_empty", "powerscoal-empty.png", TileGroup::PowerSource, 4),
    kind("powers_coal_full", "powerscoal-full.png", TileGroup::PowerSource, 4),
    kind("substation_r", "substation-R.png", TileGroup::Substation, 2),
    kind("substation_g", "substation-G.png", TileGroup::Substation, 2),
    kind("windmill_1_g", "windmill1g.png", TileGroup::PowerSource, 2),
    kind("residence_ll", "reslowlow.png", TileGroup::Residence, 3),
    kind("residence_ml", "resmedlow.png", TileGroup::Residence, 3),
    kind("residence_hl", "reshilow.png", TileGroup::Residence, 3),
    kind("residence_lh", "reslowhi.png", TileGroup::Residence, 3),
    kind("residence_mh", "resmedhi.png", TileGroup::Residence, 3),
    kind("residence_hh", "reshihi.png", TileGroup::Residence, 3),
    kind("shanty", "shanty.png", TileGroup::Residence, 2),
    kind("market_empty", "market-empty.png", TileGroup::Market, 2),
    kind("market_low", "market-low.png", TileGroup::Market, 2),
    kind("market_full", "market-full.png", TileGroup::Market, 2),
    kind("industry_l_c", "industrylq1.png", TileGroup::Industry, 3),
    kind("industry_l_q1", "industrylq1.png", TileGroup::Industry, 3),
    kind("industry_h_c", "industryhc.png", TileGroup::Industry, 4),
    kind("recycle", "recycle-centre.png", TileGroup::Industry, 2),
    kind("coalmine_empty", "coalmine-empty.png", TileGroup::Mine, 4),
    kind("oremine_5", "oremine5.png", TileGroup::Mine, 4),
    kind("tip_0", "tip0.png", TileGroup::Mine, 4),
    kind("ex_port", "ex_port.png", TileGroup::Port, 4),
    kind("farm_0", "farm0.png", TileGroup::Farm, 4),
    kind("farm_16", "farm16.png", TileGroup::Farm, 4),
    kind("commune_1", "commune1.png", TileGroup::Farm, 4),
    kind("parkland_plane", "parkland-plane.png", TileGroup::Park, 1),
    kind("parkland_lake", "parkland-lake.png", TileGroup::Park, 1),
    kind("cricket_1", "cricket1.png", TileGroup::Park, 2),
    kind("monument_0", "monument0.png", TileGroup::Monument, 2),
    kind("monument_5", "monument5.png", TileGroup::Monument, 2),
    kind("school", "school0.png", TileGroup::Civic, 2),
    kind("university", "university.png", TileGroup::Civic, 3),
    kind("health", "health.png", TileGroup::Civic, 2),
    kind("firestation_1", "firestation1.png", TileGroup::Civic, 2),
    kind("fire_1", "fire1.png", TileGroup::Fire, 1),
    kind("fire_done_1", "firedone1.png", TileGroup::Fire, 1),
    kind("rocket_1", "rocket1.png", TileGroup::Industry, 4),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_constants_match_table() {
        assert_eq!(TileType::BLANK.info().map(|i| i.name), Some("blank"));
        assert_eq!(TileType::GREEN.info().map(|i| i.name), Some("green"));
        assert_eq!(TileType::USED.info().map(|i| i.name), Some("used"));
        assert_eq!(TileType::WATER.info().map(|i| i.name), Some("water"));
        assert_eq!(TileType::ROAD.info().map(|i| i.name), Some("road_lr"));
        assert_eq!(TileType::PORT.info().map(|i| i.name), Some("ex_port"));
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(TileType::by_name("green"), Some(TileType::GREEN));
        assert_eq!(TileType::by_name("nope"), None);
    }

    #[test]
    fn out_of_table_type_degrades() {
        let t = TileType(u16::MAX);
        assert!(t.info().is_none());
        assert_eq!(t.group(), TileGroup::Blank);
        assert_eq!(t.default_size(), 1);
    }

    #[test]
    fn only_used_has_no_image() {
        let without: Vec<_> = TileType::all().filter(|t| t.info().and_then(|i| i.file).is_none()).collect();
        assert_eq!(without, vec![TileType::USED]);
    }

    #[test]
    fn footprints_fit_render_margin() {
        assert!(CATALOG.iter().all(|i| (1..=7).contains(&i.size)));
    }
}
