pub mod bd;
pub mod dkcchr;
pub mod dkcgbc;
pub mod dkl;
pub mod dkl_huffman;
pub mod gb_printer;
pub mod gba_huff20;
pub mod gba_huff50;
pub mod gba_huff60;
pub mod gba_lz77;
pub mod gba_rle;
pub mod sd;
