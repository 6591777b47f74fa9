//! Flag arithmetic for the LR35902.
//!
//! Every helper returns the result together with the complete new F value.
//! Half-carry and carry come from `a ^ b ^ result`: bit 4 (or bit 12 for the
//! 16-bit HL adds) flips exactly when a carry or borrow crossed into it.

use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

#[inline(always)]
fn z(res: u8) -> u8 {
    if res == 0 { FLAG_Z } else { 0 }
}

#[inline(always)]
fn bit_flag(cond: bool, flag: u8) -> u8 {
    if cond { flag } else { 0 }
}

/// ADD / ADC.
pub fn add8(a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let sum = a as u16 + b as u16 + carry_in as u16;
    let res = sum as u8;
    let x = a as u16 ^ b as u16 ^ sum;
    (
        res,
        z(res) | bit_flag(x & 0x10 != 0, FLAG_H) | bit_flag(x & 0x100 != 0, FLAG_C),
    )
}

/// SUB / SBC / CP.
pub fn sub8(a: u8, b: u8, borrow_in: bool) -> (u8, u8) {
    let diff = (a as u16)
        .wrapping_sub(b as u16)
        .wrapping_sub(borrow_in as u16);
    let res = diff as u8;
    let x = a as u16 ^ b as u16 ^ diff;
    (
        res,
        FLAG_N | z(res) | bit_flag(x & 0x10 != 0, FLAG_H) | bit_flag(x & 0x100 != 0, FLAG_C),
    )
}

pub fn and8(a: u8, b: u8) -> (u8, u8) {
    let res = a & b;
    (res, z(res) | FLAG_H)
}

pub fn xor8(a: u8, b: u8) -> (u8, u8) {
    let res = a ^ b;
    (res, z(res))
}

pub fn or8(a: u8, b: u8) -> (u8, u8) {
    let res = a | b;
    (res, z(res))
}

/// INC r. Carry is preserved from `f`.
pub fn inc8(val: u8, f: u8) -> (u8, u8) {
    let res = val.wrapping_add(1);
    let x = val ^ 1 ^ res;
    (res, (f & FLAG_C) | z(res) | bit_flag(x & 0x10 != 0, FLAG_H))
}

/// DEC r. Carry is preserved from `f`.
pub fn dec8(val: u8, f: u8) -> (u8, u8) {
    let res = val.wrapping_sub(1);
    let x = val ^ 1 ^ res;
    (
        res,
        (f & FLAG_C) | FLAG_N | z(res) | bit_flag(x & 0x10 != 0, FLAG_H),
    )
}

/// ADD HL,rr. Zero is preserved from `f`.
pub fn add16(hl: u16, val: u16, f: u8) -> (u16, u8) {
    let sum = hl as u32 + val as u32;
    let x = hl as u32 ^ val as u32 ^ sum;
    (
        sum as u16,
        (f & FLAG_Z) | bit_flag(x & 0x1000 != 0, FLAG_H) | bit_flag(x & 0x10000 != 0, FLAG_C),
    )
}

/// ADD SP,e8 and LD HL,SP+e8. Flags come from the unsigned low-byte add.
pub fn add_sp(sp: u16, offset: i8) -> (u16, u8) {
    let val = offset as i16 as u16;
    let res = sp.wrapping_add(val);
    let x = sp ^ val ^ res;
    (
        res,
        bit_flag(x & 0x10 != 0, FLAG_H) | bit_flag(x & 0x100 != 0, FLAG_C),
    )
}

/// Decimal adjust after a BCD add or subtract.
pub fn daa(a: u8, f: u8) -> (u8, u8) {
    let mut correction = 0u8;
    let mut carry = false;
    let subtract = f & FLAG_N != 0;
    if f & FLAG_H != 0 || (!subtract && (a & 0x0F) > 9) {
        correction |= 0x06;
    }
    if f & FLAG_C != 0 || (!subtract && a > 0x99) {
        correction |= 0x60;
        carry = true;
    }
    let res = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    (res, z(res) | (f & FLAG_N) | bit_flag(carry, FLAG_C))
}

pub fn rlc(val: u8) -> (u8, u8) {
    let res = val.rotate_left(1);
    (res, z(res) | bit_flag(val & 0x80 != 0, FLAG_C))
}

pub fn rrc(val: u8) -> (u8, u8) {
    let res = val.rotate_right(1);
    (res, z(res) | bit_flag(val & 0x01 != 0, FLAG_C))
}

pub fn rl(val: u8, carry_in: bool) -> (u8, u8) {
    let res = (val << 1) | carry_in as u8;
    (res, z(res) | bit_flag(val & 0x80 != 0, FLAG_C))
}

pub fn rr(val: u8, carry_in: bool) -> (u8, u8) {
    let res = (val >> 1) | ((carry_in as u8) << 7);
    (res, z(res) | bit_flag(val & 0x01 != 0, FLAG_C))
}

pub fn sla(val: u8) -> (u8, u8) {
    let res = val << 1;
    (res, z(res) | bit_flag(val & 0x80 != 0, FLAG_C))
}

pub fn sra(val: u8) -> (u8, u8) {
    let res = (val >> 1) | (val & 0x80);
    (res, z(res) | bit_flag(val & 0x01 != 0, FLAG_C))
}

pub fn swap(val: u8) -> (u8, u8) {
    let res = val.rotate_left(4);
    (res, z(res))
}

pub fn srl(val: u8) -> (u8, u8) {
    let res = val >> 1;
    (res, z(res) | bit_flag(val & 0x01 != 0, FLAG_C))
}

/// BIT n,r. Carry is preserved from `f`.
pub fn bit(n: u8, val: u8, f: u8) -> u8 {
    (f & FLAG_C) | FLAG_H | bit_flag(val & (1 << n) == 0, FLAG_Z)
}
