//! MBC3 real-time clock.
//!
//! The clock registers only move when the game latches them: the latch
//! reads the injected [`TimeSource`], advances the live registers by the
//! whole seconds elapsed since the previous sync, and copies them into the
//! latched set that the CPU reads.
//!
//! Register select values written to 0x4000-0x5FFF:
//!
//! | Value | Register |
//! |-------|----------|
//! | 0x08  | seconds (0-59, 6 bits) |
//! | 0x09  | minutes (0-59, 6 bits) |
//! | 0x0A  | hours (0-23, 5 bits) |
//! | 0x0B  | day counter, low 8 bits |
//! | 0x0C  | bit 0 day bit 8, bit 6 halt, bit 7 day carry |

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const RTC_FILE_MAGIC: &[u8; 4] = b"RTC1";
const RTC_FILE_VERSION: u8 = 1;
/// Serialized snapshot length in bytes.
pub const RTC_SNAPSHOT_LEN: usize = 23;

/// Wall-clock provider for the cartridge clock.
pub trait TimeSource: Send {
    fn now(&self) -> SystemTime;
}

/// Host system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A settable clock. Clones share the same time, so a test can keep one
/// handle and give another to the cartridge.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    nanos_since_epoch: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(start: SystemTime) -> Self {
        let source = Self {
            nanos_since_epoch: Arc::new(AtomicU64::new(0)),
        };
        source.set(start);
        source
    }

    pub fn set(&self, now: SystemTime) {
        let nanos = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        self.nanos_since_epoch
            .store(nanos.min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let nanos = by.as_nanos().min(u64::MAX as u128) as u64;
        self.nanos_since_epoch.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.nanos_since_epoch.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RtcRegisters {
    pub(crate) seconds: u8,
    pub(crate) minutes: u8,
    pub(crate) hours: u8,
    pub(crate) days: u16,
    pub(crate) halt: bool,
    pub(crate) carry: bool,
}

impl RtcRegisters {
    fn control_byte(&self) -> u8 {
        let mut out = ((self.days >> 8) as u8) & 0x01;
        if self.halt {
            out |= 0x40;
        }
        if self.carry {
            out |= 0x80;
        }
        out
    }
}

/// Persistable clock state: the live registers plus the wall time they
/// were last brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcSnapshot {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub days: u16,
    pub halt: bool,
    pub carry: bool,
    pub last_sync: SystemTime,
}

impl RtcSnapshot {
    /// `RTC1` little-endian layout: magic, version, sync time (seconds and
    /// sub-second nanos), seconds, minutes, hours, days, flags.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(RTC_SNAPSHOT_LEN);
        data.extend_from_slice(RTC_FILE_MAGIC);
        data.push(RTC_FILE_VERSION);

        let since_epoch = self.last_sync.duration_since(UNIX_EPOCH).unwrap_or_default();
        data.extend_from_slice(&since_epoch.as_secs().to_le_bytes());
        data.extend_from_slice(&since_epoch.subsec_nanos().to_le_bytes());
        data.push(self.seconds & 0x3F);
        data.push(self.minutes & 0x3F);
        data.push(self.hours & 0x1F);
        data.extend_from_slice(&(self.days & 0x01FF).to_le_bytes());

        let mut flags = 0u8;
        if self.halt {
            flags |= 0x01;
        }
        if self.carry {
            flags |= 0x02;
        }
        data.push(flags);
        data
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < RTC_SNAPSHOT_LEN
            || &data[..4] != RTC_FILE_MAGIC
            || data[4] != RTC_FILE_VERSION
        {
            return None;
        }

        let secs = u64::from_le_bytes(data[5..13].try_into().ok()?);
        let nanos = u32::from_le_bytes(data[13..17].try_into().ok()?).min(999_999_999);
        let flags = data[22];
        Some(Self {
            seconds: data[17] & 0x3F,
            minutes: data[18] & 0x3F,
            hours: data[19] & 0x1F,
            days: u16::from_le_bytes([data[20], data[21]]) & 0x01FF,
            halt: flags & 0x01 != 0,
            carry: flags & 0x02 != 0,
            last_sync: UNIX_EPOCH + Duration::new(secs, nanos),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Mbc3Rtc {
    pub(crate) regs: RtcRegisters,
    latched: RtcRegisters,
    last_sync: SystemTime,
}

impl Mbc3Rtc {
    pub(crate) fn new(now: SystemTime) -> Self {
        let regs = RtcRegisters::default();
        Self {
            regs,
            latched: regs,
            last_sync: now,
        }
    }

    /// Bring the live registers up to `now` and copy them to the latched set.
    pub(crate) fn latch(&mut self, now: SystemTime) {
        self.sync(now);
        self.latched = self.regs;
    }

    pub(crate) fn read_latched(&self, reg: u8) -> u8 {
        match reg {
            0x08 => self.latched.seconds & 0x3F,
            0x09 => self.latched.minutes & 0x3F,
            0x0A => self.latched.hours & 0x1F,
            0x0B => (self.latched.days & 0x00FF) as u8,
            0x0C => self.latched.control_byte(),
            _ => 0xFF,
        }
    }

    pub(crate) fn write_register(&mut self, reg: u8, value: u8, now: SystemTime) {
        self.sync(now);
        match reg {
            0x08 => {
                self.regs.seconds = value & 0x3F;
                // Sub-second phase restarts.
                self.last_sync = now;
            }
            0x09 => self.regs.minutes = value & 0x3F,
            0x0A => self.regs.hours = value & 0x1F,
            0x0B => self.regs.days = (self.regs.days & 0x0100) | value as u16,
            0x0C => {
                self.regs.days = (self.regs.days & 0x00FF) | (((value & 0x01) as u16) << 8);
                self.regs.halt = value & 0x40 != 0;
                self.regs.carry = value & 0x80 != 0;
            }
            _ => {}
        }
        self.latched = self.regs;
    }

    /// Apply whole seconds elapsed since the last sync. The fractional
    /// remainder stays pending for the next sync.
    fn sync(&mut self, now: SystemTime) {
        let elapsed = now.duration_since(self.last_sync).unwrap_or_default();
        if self.regs.halt {
            self.last_sync = now;
            return;
        }
        let seconds = elapsed.as_secs();
        if seconds > 0 {
            self.last_sync += Duration::from_secs(seconds);
            self.advance_seconds(seconds);
        }
    }

    pub(crate) fn snapshot(&self) -> RtcSnapshot {
        RtcSnapshot {
            seconds: self.regs.seconds,
            minutes: self.regs.minutes,
            hours: self.regs.hours,
            days: self.regs.days,
            halt: self.regs.halt,
            carry: self.regs.carry,
            last_sync: self.last_sync,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: RtcSnapshot) {
        self.regs = RtcRegisters {
            seconds: snapshot.seconds & 0x3F,
            minutes: snapshot.minutes & 0x3F,
            hours: snapshot.hours & 0x1F,
            days: snapshot.days & 0x01FF,
            halt: snapshot.halt,
            carry: snapshot.carry,
        };
        self.last_sync = snapshot.last_sync;
        self.latched = self.regs;
    }

    pub(crate) fn advance_seconds(&mut self, mut seconds: u64) {
        // Skip whole days first so long absences stay cheap.
        const SECONDS_PER_DAY: u64 = 86_400;
        if self.regs.seconds <= 59 && self.regs.minutes <= 59 && self.regs.hours <= 23 {
            let total = self.regs.days as u64 + seconds / SECONDS_PER_DAY;
            if total > 0x01FF {
                self.regs.carry = true;
            }
            self.regs.days = (total & 0x01FF) as u16;
            seconds %= SECONDS_PER_DAY;
        }

        while seconds > 0 {
            let until_minute_tick = self.seconds_until_minute_tick();
            if seconds < until_minute_tick {
                self.regs.seconds = ((self.regs.seconds as u64 + seconds) & 0x3F) as u8;
                return;
            }

            seconds -= until_minute_tick;
            self.regs.seconds = 0;
            self.minute_tick();
        }
    }

    fn seconds_until_minute_tick(&self) -> u64 {
        let sec = self.regs.seconds as u64;
        if sec <= 59 {
            60 - sec
        } else {
            // Out-of-range values count up to 63, wrap to 0, then need a
            // full minute.
            (63 - sec + 1) + 60
        }
    }

    fn minute_tick(&mut self) {
        let overflow = self.regs.minutes == 59;
        self.regs.minutes = ((self.regs.minutes as u16 + 1) & 0x3F) as u8;
        if overflow {
            self.regs.minutes = 0;
            self.hour_tick();
        }
    }

    fn hour_tick(&mut self) {
        let overflow = self.regs.hours == 23;
        self.regs.hours = ((self.regs.hours as u16 + 1) & 0x1F) as u8;
        if overflow {
            self.regs.hours = 0;
            self.day_tick();
        }
    }

    fn day_tick(&mut self) {
        if self.regs.days >= 0x01FF {
            self.regs.days = 0;
            self.regs.carry = true;
        } else {
            self.regs.days = (self.regs.days + 1) & 0x01FF;
        }
    }
}
