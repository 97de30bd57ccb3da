pub mod acia6551;
pub mod banked_ram;
pub mod hid;
pub mod cf_card;
pub mod joystick;
pub mod keyboard_encoder;
pub mod keyboard_matrix;
pub mod rtc_ds1511;
pub mod sid6581;
pub mod vdp9918;
pub mod via6522;
