use crate::boxes::FourCC;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

/// Format-specific read shapes layered over any `Read`, complementing the
/// plain big-endian integer reads from `byteorder`.
pub trait ReadBmffExt: Read {
    /// Four-character type/brand code.
    fn read_fourcc(&mut self) -> io::Result<FourCC> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(FourCC(b))
    }

    /// 16.16 fixed point as a float.
    fn read_fixed16(&mut self) -> io::Result<f64> {
        Ok(self.read_u32::<BigEndian>()? as f64 / 65536.0)
    }

    /// 8.8 fixed point as a float.
    fn read_fixed8(&mut self) -> io::Result<f64> {
        Ok(self.read_u16::<BigEndian>()? as f64 / 256.0)
    }

    /// ISO-639-2/T language packed as three 5-bit characters in 16 bits.
    fn read_language(&mut self) -> io::Result<String> {
        let code = self.read_u16::<BigEndian>()?;
        if code == 0 {
            return Ok("und".to_string());
        }
        let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
        let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
        let c3 = (code & 0x1F) as u8 + 0x60;
        Ok(format!("{}{}{}", c1 as char, c2 as char, c3 as char))
    }

    /// Pascal string stored in a fixed block: one length byte followed by
    /// `block_len - 1` bytes of storage. Consumes the whole block.
    fn read_pstring(&mut self, block_len: usize) -> io::Result<String> {
        debug_assert!(block_len > 0);
        let mut buf = vec![0u8; block_len];
        self.read_exact(&mut buf)?;
        let n = (buf[0] as usize).min(block_len - 1);
        Ok(String::from_utf8_lossy(&buf[1..1 + n]).into_owned())
    }

    /// Advance past `n` bytes without interpreting them.
    fn skip_bytes(&mut self, n: u64) -> io::Result<()> {
        io::copy(&mut self.take(n), &mut io::sink())?;
        Ok(())
    }
}

impl<R: Read + ?Sized> ReadBmffExt for R {}
