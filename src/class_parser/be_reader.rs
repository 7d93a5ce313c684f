use std::io::Read;

/// Big endian integers as laid out in class files
pub trait BEReader: Sized {
    fn read(reader: &mut impl Read) -> std::io::Result<Self>;
}

macro_rules! be_reader {
    ($($t: ty),*) => {$(
        impl BEReader for $t {
            fn read(reader: &mut impl Read) -> std::io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                reader.read_exact(&mut buf)?;
                Ok(<$t>::from_be_bytes(buf))
            }
        }
    )*}
}

be_reader!(u8, u16, u32);
