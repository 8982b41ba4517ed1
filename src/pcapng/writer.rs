use std::io::Write;

use log::{debug, warn};

use crate::config::WriterOptions;
use crate::packet::{Packet, TraceInterface, MICROS_PER_SEC};
use crate::serialize::ToVec;
use crate::PcapError;

use super::*;

/// PCAPNG writer
///
/// Output is little-endian, in a single section. Packets are written as Enhanced
/// Packet Blocks; each one must reference an interface declared in the section.
pub struct PcapNGWriter<W: Write> {
    writer: W,
    interfaces: Vec<TraceInterface>,
    options: WriterOptions,
    /// Declare interfaces for unknown link types on the fly
    implicit_interfaces: bool,
    written: u64,
}

impl<W: Write> PcapNGWriter<W> {
    /// Create a writer for a new file, writing the Section Header Block
    pub fn new(mut writer: W, options: WriterOptions) -> Result<PcapNGWriter<W>, PcapError> {
        let mut shb_options = Vec::new();
        if let Some(appl) = &options.user_application {
            shb_options.push(PcapNGOption::new(OptionCode::ShbUserAppl, appl.as_bytes()));
        }
        let v = SectionHeaderBlock::new(shb_options).to_vec()?;
        writer.write_all(&v)?;
        debug!("pcapng section header written ({} bytes)", v.len());
        Ok(PcapNGWriter {
            writer,
            interfaces: Vec::new(),
            options,
            implicit_interfaces: true,
            written: v.len() as u64,
        })
    }

    /// Create a writer adding blocks to the last section of an existing file
    ///
    /// `interfaces` are the interfaces declared in that section, in order.
    pub fn appending(
        writer: W,
        interfaces: Vec<TraceInterface>,
        options: WriterOptions,
        file_len: u64,
    ) -> PcapNGWriter<W> {
        debug!("appending to pcapng section with {} interface(s)", interfaces.len());
        PcapNGWriter {
            writer,
            interfaces,
            options,
            implicit_interfaces: false,
            written: file_len,
        }
    }

    /// Interfaces of the section being written
    pub fn interfaces(&self) -> &[TraceInterface] {
        &self.interfaces
    }

    /// Declare an interface, returning its index
    ///
    /// The timestamp resolution must be a power of 10 or a power of 2.
    pub fn add_interface(&mut self, iface: &TraceInterface) -> Result<u32, PcapError> {
        let code = ts_resolution_code(iface.timestamp_resolution).ok_or_else(|| {
            PcapError::FormatMismatch(format!(
                "timestamp resolution {} cannot be encoded",
                iface.timestamp_resolution
            ))
        })?;
        self.write_interface(iface.clone(), code)
    }

    fn write_interface(&mut self, iface: TraceInterface, if_tsresol: u8) -> Result<u32, PcapError> {
        let v = InterfaceDescriptionBlock::from_interface(&iface, if_tsresol).to_vec()?;
        self.writer.write_all(&v)?;
        self.written += v.len() as u64;
        let index = self.interfaces.len() as u32;
        debug!(
            "interface {} declared: {:?} ({})",
            index, iface.name, iface.data_link_type
        );
        self.interfaces.push(iface);
        Ok(index)
    }

    /// Find the interface a packet is written to
    fn select_interface(&mut self, packet: &Packet) -> Result<u32, PcapError> {
        if let Some(idx) = packet.interface_index {
            match self.interfaces.get(idx as usize) {
                Some(iface) if iface.data_link_type == packet.data_link_type => return Ok(idx),
                _ => (),
            }
        }
        if let Some(idx) = self
            .interfaces
            .iter()
            .position(|iface| iface.data_link_type == packet.data_link_type)
        {
            return Ok(idx as u32);
        }
        if !self.implicit_interfaces {
            return Err(PcapError::FormatMismatch(format!(
                "no interface with link type {} in the existing section",
                packet.data_link_type
            )));
        }
        let mut code = self.options.pcapng_timestamp_resolution;
        let resolution = match build_ts_resolution(code) {
            Some(r) => r,
            None => {
                warn!("invalid timestamp resolution code {}, using microseconds", code);
                code = 6;
                MICROS_PER_SEC
            }
        };
        let mut iface = TraceInterface::new(packet.data_link_type);
        iface.timestamp_resolution = resolution;
        iface.snaplen = self.options.snaplen;
        self.write_interface(iface, code)
    }

    pub fn write_packet(&mut self, packet: &Packet) -> Result<(), PcapError> {
        if u64::from(packet.timestamp_microseconds) >= MICROS_PER_SEC {
            return Err(PcapError::MalformedRecord {
                offset: self.written,
                reason: "microseconds must be below one second",
            });
        }
        let if_id = self.select_interface(packet)?;
        let iface = &self.interfaces[if_id as usize];
        let ts = iface.raw_timestamp(packet.timestamp_seconds, packet.timestamp_microseconds);
        let data = packet.data();
        let origlen = packet.original_length.max(data.len() as u32);
        let v = EnhancedPacketBlock::new(if_id, ts, origlen, data).to_vec()?;
        self.writer.write_all(&v)?;
        self.written += v.len() as u64;
        Ok(())
    }

    /// Number of bytes in the file, including the existing content when appending
    pub fn position(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), PcapError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying output
    pub fn into_inner(self) -> W {
        self.writer
    }
}
