use std::io::{self, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, WriteBytesExt};
use derivative::Derivative;
use static_assertions::const_assert_eq;

use crate::cursor::Cursor;
use crate::string::SizedCStringUtf16;
use crate::{CtrError, CtrResult};

pub const SMDH_SIZE: usize = 0x36c0;
const TITLE_COUNT: usize = 0x10;
const TITLE_SIZE: usize = (0x40 + 0x80 + 0x40) * 2;
const SMALL_ICON_PIXELS: usize = 24 * 24;
const LARGE_ICON_PIXELS: usize = 48 * 48;

const_assert_eq!(TITLE_SIZE, 0x200);
const_assert_eq!(
    8 + TITLE_COUNT * TITLE_SIZE + 0x10 + 4 + 0xc + 4 + 2 + 2 + 4 + 4 + 8
        + (SMALL_ICON_PIXELS + LARGE_ICON_PIXELS) * 2,
    SMDH_SIZE
);

/// Application icon and titles, as stored in the CIA meta region
#[derive(Derivative, Clone, PartialEq)]
#[derivative(Debug)]
pub struct Smdh {
    version: u16,
    #[derivative(Debug = "ignore")]
    _reserved0: u16,
    titles: [SmdhTitle; TITLE_COUNT],
    age_ratings: [AgeRating; 0x10],
    region_lockout: RegionLockout,
    matchmaker_id: MatchmakerId,
    flags: SmdhFlags,
    eula_version: EulaVersion,
    #[derivative(Debug = "ignore")]
    _reserved1: u16,
    optimal_animation_default_frame: f32,
    cec_id: u32,
    #[derivative(Debug = "ignore")]
    _reserved2: u64,
    #[derivative(Debug = "ignore")]
    icon: SmdhIcon,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EulaVersion {
    pub major: u8,
    pub minor: u8,
}

impl Smdh {
    /// Reads exactly [`SMDH_SIZE`] bytes
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let mut cur = cur.take(SMDH_SIZE)?;
        if cur.read_bytes(4)? != b"SMDH" {
            return Err(CtrError::InvalidMagic);
        }
        let version = cur.read_u16::<LittleEndian>()?;
        let _reserved0 = cur.read_u16::<LittleEndian>()?;

        let mut titles: [SmdhTitle; TITLE_COUNT] = Default::default();
        for title in &mut titles {
            *title = SmdhTitle::read(&mut cur)?;
        }
        let age_ratings = cur.read_array::<0x10>()?.map(AgeRating::from_bits_retain);
        let region_lockout = RegionLockout::from_bits_retain(cur.read_u32::<LittleEndian>()?);
        let matchmaker_id = MatchmakerId {
            id: cur.read_u32::<LittleEndian>()?,
            bit_id: cur.read_u64::<LittleEndian>()?,
        };
        let flags = SmdhFlags::from_bits_retain(cur.read_u32::<LittleEndian>()?);
        let eula_version = EulaVersion {
            minor: cur.read_u8()?,
            major: cur.read_u8()?,
        };
        let _reserved1 = cur.read_u16::<LittleEndian>()?;
        let optimal_animation_default_frame = f32::from_bits(cur.read_u32::<LittleEndian>()?);
        let cec_id = cur.read_u32::<LittleEndian>()?;
        let _reserved2 = cur.read_u64::<LittleEndian>()?;
        let icon = SmdhIcon {
            small: IconData::read(&mut cur)?,
            big: IconData::read(&mut cur)?,
        };

        Ok(Self {
            version,
            _reserved0,
            titles,
            age_ratings,
            region_lockout,
            matchmaker_id,
            flags,
            eula_version,
            _reserved1,
            optimal_animation_default_frame,
            cec_id,
            _reserved2,
            icon,
        })
    }
    pub fn from_bytes(bytes: &[u8]) -> CtrResult<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"SMDH")?;
        w.write_u16::<LittleEndian>(self.version)?;
        w.write_u16::<LittleEndian>(self._reserved0)?;
        for title in &self.titles {
            title.write(w)?;
        }
        for rating in &self.age_ratings {
            w.write_u8(rating.bits())?;
        }
        w.write_u32::<LittleEndian>(self.region_lockout.bits())?;
        w.write_u32::<LittleEndian>(self.matchmaker_id.id)?;
        w.write_u64::<LittleEndian>(self.matchmaker_id.bit_id)?;
        w.write_u32::<LittleEndian>(self.flags.bits())?;
        w.write_u8(self.eula_version.minor)?;
        w.write_u8(self.eula_version.major)?;
        w.write_u16::<LittleEndian>(self._reserved1)?;
        w.write_f32::<LittleEndian>(self.optimal_animation_default_frame)?;
        w.write_u32::<LittleEndian>(self.cec_id)?;
        w.write_u64::<LittleEndian>(self._reserved2)?;
        self.icon.small.write(w)?;
        self.icon.big.write(w)
    }
    pub fn encode(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(SMDH_SIZE);
        self.write(&mut out)?;
        Ok(out)
    }

    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }
    #[must_use]
    pub fn title(&self, lang: Language) -> &SmdhTitle {
        &self.titles[lang as usize]
    }
    pub fn title_mut(&mut self, lang: Language) -> &mut SmdhTitle {
        &mut self.titles[lang as usize]
    }
    #[must_use]
    pub fn age_rating(&self, region: AgeRatingRegion) -> AgeRating {
        self.age_ratings[region as usize]
    }
    #[must_use]
    pub fn region_lockout(&self) -> RegionLockout {
        self.region_lockout
    }
    #[must_use]
    pub fn matchmaker_id(&self) -> &MatchmakerId {
        &self.matchmaker_id
    }
    #[must_use]
    pub fn flags(&self) -> SmdhFlags {
        self.flags
    }
    #[must_use]
    pub fn eula_version(&self) -> &EulaVersion {
        &self.eula_version
    }
    #[must_use]
    pub fn optimal_animation_default_frame(&self) -> f32 {
        self.optimal_animation_default_frame
    }
    #[must_use]
    pub fn cec_id(&self) -> u32 {
        self.cec_id
    }
    #[must_use]
    pub fn small_icon(&self) -> &IconData<SMALL_ICON_PIXELS> {
        &self.icon.small
    }
    #[must_use]
    pub fn large_icon(&self) -> &IconData<LARGE_ICON_PIXELS> {
        &self.icon.big
    }
}

impl Default for Smdh {
    fn default() -> Self {
        Self {
            version: 0,
            _reserved0: 0,
            titles: Default::default(),
            age_ratings: [AgeRating::empty(); 0x10],
            region_lockout: RegionLockout::REGION_FREE,
            matchmaker_id: MatchmakerId::default(),
            flags: SmdhFlags::VISIBLE_IN_HOMEMENU,
            eula_version: EulaVersion::default(),
            _reserved1: 0,
            optimal_animation_default_frame: 0.0,
            cec_id: 0,
            _reserved2: 0,
            icon: SmdhIcon {
                small: IconData::default(),
                big: IconData::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[repr(usize)]
pub enum AgeRatingRegion {
    Cero = 0,
    Esrb = 1,
    // reserved
    Usk = 3,
    PegiGen = 4,
    // reserved
    PegiPrt = 6,
    PegiBbfc = 7,
    Cob = 8,
    Grb = 9,
    Cgsrr = 10,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AgeRating: u8 {
        const ENABLED = 0x80;
        const PENDING = 0x40;
        const NO_AGE_RESTRICTION = 0x20;
        const _ = !0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionLockout: u32 {
        const JAPAN = 0x1;
        const NORTH_AMERICA = 0x2;
        const EUROPE = 0x4;
        const AUSTRALIA = 0x8;
        const CHINA = 0x10;
        const KOREA = 0x20;
        const TAIWAN = 0x40;
        const REGION_FREE = 0x7fff_ffff;
        const _ = !0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SmdhFlags: u32 {
        const VISIBLE_IN_HOMEMENU = 0x1;
        const AUTOBOOT_GAMECART = 0x2;
        const ALLOW_3D = 0x4;
        const REQUIRE_CTR_EULA = 0x8;
        const AUTOSAVE_ON_EXIT = 0x10;
        const EXTBANNER_USED = 0x20;
        const REGION_RATING_REQUIRED = 0x40;
        const USES_SAVE_DATA = 0x80;
        const RECORD_USAGE = 0x100;
        const DISABLE_SD_SAVE_BACKUP = 0x400;
        const NEW3DS_EXCLUSIVE = 0x1000;
        const _ = !0;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchmakerId {
    pub id: u32,
    pub bit_id: u64,
}

#[derive(Debug, Clone, Copy)]
#[repr(usize)]
pub enum Language {
    Japanese = 0,
    English,
    French,
    German,
    Italian,
    Spanish,
    SimplifiedChinese,
    Korean,
    Dutch,
    Portugese,
    Russian,
    TraditionalChinese,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmdhTitle {
    pub short_desc: SizedCStringUtf16<0x40>,
    pub long_desc: SizedCStringUtf16<0x80>,
    pub publisher: SizedCStringUtf16<0x40>,
}

impl SmdhTitle {
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        Ok(Self {
            short_desc: SizedCStringUtf16::read_le(cur)?,
            long_desc: SizedCStringUtf16::read_le(cur)?,
            publisher: SizedCStringUtf16::read_le(cur)?,
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.short_desc.write_le(w)?;
        self.long_desc.write_le(w)?;
        self.publisher.write_le(w)
    }
}

#[derive(Clone, PartialEq, Eq)]
struct SmdhIcon {
    small: IconData<SMALL_ICON_PIXELS>,
    big: IconData<LARGE_ICON_PIXELS>,
}

/// Tiled RGB565 pixels, kept as stored
#[derive(Clone, PartialEq, Eq)]
pub struct IconData<const SIZE: usize> {
    data: Box<[u16; SIZE]>,
}

impl<const SIZE: usize> IconData<SIZE> {
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        let mut data = Box::new([0u16; SIZE]);
        for pixel in data.iter_mut() {
            *pixel = cur.read_u16::<LittleEndian>()?;
        }
        Ok(Self { data })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for pixel in self.data.iter() {
            w.write_u16::<LittleEndian>(*pixel)?;
        }
        Ok(())
    }
    #[must_use]
    pub fn raw_data(&self) -> &[u16; SIZE] {
        &self.data
    }
    pub fn raw_data_mut(&mut self) -> &mut [u16; SIZE] {
        &mut self.data
    }
}

impl<const SIZE: usize> Default for IconData<SIZE> {
    fn default() -> Self {
        Self {
            data: Box::new([0u16; SIZE]),
        }
    }
}
