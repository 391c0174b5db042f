pub mod things;
