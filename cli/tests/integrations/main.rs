mod select;
mod title;
